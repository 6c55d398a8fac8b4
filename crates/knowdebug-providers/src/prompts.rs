//! Prompt construction and response schemas for LLM-backed generators.

use serde_json::{json, Value};

use knowdebug_core::model::OPTION_COUNT;
use knowdebug_core::traits::{OutlineRequest, QuestionRequest, ReportRequest};

const DIFFICULTY_GUIDELINES: &str = "\
- 1-20: basic definitions and simple recall
- 21-40: understanding and simple application of the concepts
- 41-60: analysis and moderate application
- 61-80: synthesis and problem solving with the methods shown
- 81-100: expert-level evaluation of the advanced topics";

const KNOWLEDGE_LEVEL_GUIDELINES: &str = "\
- Beginner (0-40% accuracy): basic understanding, needs to revisit the foundations
- Intermediate (41-70% accuracy): solid grasp of the fundamentals, ready for application
- Advanced (71-85% accuracy): strong competency, handles complex scenarios
- Expert (86-100% accuracy): mastery of the material";

/// Prompt asking for the main topic and 4-5 assessable domains of a source.
pub fn outline_prompt(request: &OutlineRequest) -> String {
    format!(
        r#"You are an educational content analyst. Break the material at the source below into knowledge domains for an assessment.

Source: {source}

1. Infer the main topic and the key learning points of the material.
2. Split the content into 4-5 distinct, assessable knowledge domains.
3. For each domain give a name and a one-sentence description of what it covers.
4. Estimate each domain's difficulty on a 1-100 scale (introductions are easier, advanced applications harder).

Respond with JSON only, in this shape:
{{
  "main_topic": "string",
  "domains": [
    {{"domain_name": "string", "description": "string", "estimated_difficulty": 20}}
  ]
}}"#,
        source = request.source,
    )
}

/// Prompt asking for one multiple-choice question at a target difficulty.
pub fn question_prompt(request: &QuestionRequest) -> String {
    let gaps = if request.knowledge_gaps.is_empty() {
        "none".to_string()
    } else {
        request.knowledge_gaps.join(", ")
    };
    let source = request.source.as_deref().unwrap_or("general knowledge");

    format!(
        r#"You are an assessment designer. Write one multiple-choice question about the material at the source below.

Source: {source}
Domain: {domain}
Difficulty: {difficulty} (1 = very basic, 100 = expert)
Known knowledge gaps: {gaps}

1. Test a specific fact, concept, or skill from the material within the domain.
2. Match the difficulty precisely.
3. If knowledge gaps are listed, focus the question on them.
4. Give exactly {count} options with exactly one correct answer; distractors should reflect common misconceptions.
5. Provide a short knowledge tag, an explanation of the correct answer, and the time in seconds a knowledgeable person needs to answer.

Difficulty guidelines:
{guidelines}

Respond with JSON only, in this shape:
{{
  "question": "string",
  "options": ["string", "string", "string", "string"],
  "correct_answer_index": 0,
  "knowledge_tag": "string",
  "explanation": "string",
  "difficulty_level": {difficulty},
  "estimated_time": 30
}}"#,
        domain = request.domain_name,
        difficulty = request.difficulty,
        count = OPTION_COUNT,
        guidelines = DIFFICULTY_GUIDELINES,
    )
}

/// Prompt asking for the final report over the completed domains.
pub fn report_prompt(request: &ReportRequest) -> String {
    let domains: Vec<Value> = request
        .domains
        .iter()
        .map(|d| {
            json!({
                "domain": d.domain_name,
                "accuracy": d.accuracy(),
                "status": d.status,
                "knowledge_gaps": d.knowledge_gaps,
                "mastery_areas": d.mastery_areas,
            })
        })
        .collect();
    let source = request.source.as_deref().unwrap_or("general knowledge");
    let minutes = request.elapsed_minutes();
    let accuracy = request.overall_accuracy();

    format!(
        r#"You are a knowledge assessor. Analyse a learner's results on an assessment about the material at the source below and write a report.

Source: {source}
Main topic: {topic}
Results per domain:
{data:#}
Total time (minutes): {minutes:.1}
Overall accuracy: {accuracy:.2}

1. Determine the overall knowledge level: Beginner, Intermediate, Advanced or Expert.
2. Name the strongest domains and specific mastery areas.
3. Name the areas needing improvement and the specific knowledge gaps.
4. Give 3-5 specific, actionable recommendations that point back to parts of the material.
5. Give a per-domain breakdown with score (0-100), status, key strengths and improvement areas.

Knowledge level guidelines:
{guidelines}

Respond with JSON only, in this shape:
{{
  "title": "Knowledge Assessment Report: {topic}",
  "overall_score": {score:.1},
  "total_time_minutes": {minutes:.1},
  "domains_assessed": {count},
  "knowledge_level": "Intermediate",
  "strengths": ["string"],
  "areas_for_improvement": ["string"],
  "recommendations": ["string"],
  "detailed_breakdown": {{
    "domain name": {{"score": 85.5, "status": "mastered", "key_strengths": ["string"], "improvement_areas": ["string"]}}
  }}
}}"#,
        topic = request.main_topic,
        data = Value::Array(domains),
        score = accuracy * 100.0,
        count = request.domains.len(),
        guidelines = KNOWLEDGE_LEVEL_GUIDELINES,
    )
}

/// Response schema for [`outline_prompt`], in the OpenAPI subset Gemini accepts.
pub fn outline_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "main_topic": {"type": "STRING"},
            "domains": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "domain_name": {"type": "STRING"},
                        "description": {"type": "STRING"},
                        "estimated_difficulty": {"type": "INTEGER"}
                    },
                    "required": ["domain_name", "description", "estimated_difficulty"]
                }
            }
        },
        "required": ["main_topic", "domains"]
    })
}

pub fn question_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": {"type": "STRING"},
            "options": {"type": "ARRAY", "items": {"type": "STRING"}},
            "correct_answer_index": {"type": "INTEGER"},
            "knowledge_tag": {"type": "STRING"},
            "explanation": {"type": "STRING"},
            "difficulty_level": {"type": "INTEGER"},
            "estimated_time": {"type": "INTEGER"}
        },
        "required": [
            "question", "options", "correct_answer_index", "knowledge_tag",
            "explanation", "difficulty_level", "estimated_time"
        ]
    })
}

/// Breakdown entries are keyed by domain name, so the schema leaves the
/// `detailed_breakdown` object open.
pub fn report_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "overall_score": {"type": "NUMBER"},
            "total_time_minutes": {"type": "NUMBER"},
            "domains_assessed": {"type": "INTEGER"},
            "knowledge_level": {
                "type": "STRING",
                "enum": ["Beginner", "Intermediate", "Advanced", "Expert"]
            },
            "strengths": {"type": "ARRAY", "items": {"type": "STRING"}},
            "areas_for_improvement": {"type": "ARRAY", "items": {"type": "STRING"}},
            "recommendations": {"type": "ARRAY", "items": {"type": "STRING"}},
            "detailed_breakdown": {
                "type": "OBJECT",
                "properties": {}
            }
        },
        "required": [
            "title", "overall_score", "total_time_minutes", "domains_assessed",
            "knowledge_level", "strengths", "areas_for_improvement",
            "recommendations", "detailed_breakdown"
        ]
    })
}

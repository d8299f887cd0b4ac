use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Result, bail};
use clap::ValueEnum;
use regex::{Captures, Regex};

use crate::catalog::Catalog;
use crate::classify::DEFAULT_AGE_GROUP;
use crate::model::ReadingTextRecord;

const MISSING_VALUE: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TaskType {
    /// Comprehension questions with four answer choices.
    Comprehension,
    /// Vocabulary exercises drawn from the passage.
    Vocabulary,
    /// Scaffolded summary writing task.
    Summary,
    /// Complete lesson plan built around the passage.
    LessonPlan,
    /// College entrance exam style items.
    CsatStyle,
    /// Rewrite of the passage at another band.
    GradedReader,
    /// Discussion and critical thinking questions.
    Discussion,
    /// Grammar patterns taught in context.
    GrammarFocus,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comprehension => "comprehension",
            Self::Vocabulary => "vocabulary",
            Self::Summary => "summary",
            Self::LessonPlan => "lesson-plan",
            Self::CsatStyle => "csat-style",
            Self::GradedReader => "graded-reader",
            Self::Discussion => "discussion",
            Self::GrammarFocus => "grammar-focus",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Comprehension => "Reading Comprehension Questions",
            Self::Vocabulary => "Vocabulary Exercise",
            Self::Summary => "Summary Writing Guide",
            Self::LessonPlan => "Lesson Plan",
            Self::CsatStyle => "CSAT-Style Questions",
            Self::GradedReader => "Graded Reader (Level Adaptation)",
            Self::Discussion => "Discussion Questions",
            Self::GrammarFocus => "Grammar in Context",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Comprehension => COMPREHENSION_TEMPLATE,
            Self::Vocabulary => VOCABULARY_TEMPLATE,
            Self::Summary => SUMMARY_TEMPLATE,
            Self::LessonPlan => LESSON_PLAN_TEMPLATE,
            Self::CsatStyle => CSAT_STYLE_TEMPLATE,
            Self::GradedReader => GRADED_READER_TEMPLATE,
            Self::Discussion => DISCUSSION_TEMPLATE,
            Self::GrammarFocus => GRAMMAR_FOCUS_TEMPLATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    pub num_questions: u32,
    pub target_band: String,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            num_questions: 5,
            target_band: "500-700".to_string(),
        }
    }
}

pub fn adaptation_rules(band: &str) -> &'static str {
    match band {
        "100-300" => {
            "Use ONLY simple sentences (S+V+O), max 8-10 words per sentence. Present tense. Basic sight words only. No abstract vocabulary."
        }
        "300-500" => {
            "Simple and compound sentences. Use 'because', 'so', 'but'. Avg 8-12 words/sentence. Common everyday vocabulary."
        }
        "500-700" => {
            "Mix of simple, compound, complex sentences. Avg 10-14 words/sentence. Subordinate clauses (when, if, although). Basic academic words."
        }
        "700-900" => {
            "Varied structures including compound-complex. Avg 12-18 words/sentence. Participial phrases, relative clauses. General academic vocabulary."
        }
        "900-1100" => {
            "Complex structures with embedded clauses. Avg 15-22 words/sentence. Nominalization, discourse markers. Academic word list."
        }
        "1100-1300" => {
            "Sophisticated structures: appositives, reduced clauses. Avg 18-25 words/sentence. Hedging language. Exam-style implicit reasoning."
        }
        "1300-1500" => {
            "Dense academic prose. Avg 20-28 words/sentence. Formal register, nominalization, advanced academic vocabulary."
        }
        _ => "",
    }
}

pub fn target_word_count(band: &str) -> i64 {
    match band {
        "100-300" => 50,
        "300-500" => 100,
        "500-700" => 150,
        "700-900" => 200,
        "900-1100" => 250,
        "1100-1300" => 300,
        "1300-1500" => 350,
        _ => 200,
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid"))
}

/// Substitutes `{name}` placeholders. Braces that do not enclose a lowercase
/// identifier are left untouched, so JSON examples can appear verbatim.
pub fn render_template(template: &str, values: &BTreeMap<&str, String>) -> Result<String> {
    let placeholder = placeholder_regex();

    for captures in placeholder.captures_iter(template) {
        let name = &captures[1];
        if !values.contains_key(name) {
            bail!("template references unknown placeholder {{{name}}}");
        }
    }

    let rendered = placeholder.replace_all(template, |captures: &Captures<'_>| {
        values.get(&captures[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

fn text_or_missing(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .unwrap_or(MISSING_VALUE)
        .to_string()
}

fn number_or_missing<T: ToString>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| MISSING_VALUE.to_string())
}

fn record_values(record: &ReadingTextRecord) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("text_id", text_or_missing(&record.text_id)),
        ("lexile_band", text_or_missing(&record.band)),
        ("lexile_score", number_or_missing(record.score)),
        ("age_group", text_or_missing(&record.age_group)),
        ("grade_hint", text_or_missing(&record.grade_hint)),
        ("genre", text_or_missing(&record.genre)),
        ("topic", text_or_missing(&record.topic)),
        ("word_count", number_or_missing(record.word_count)),
        ("length_type", text_or_missing(&record.length_type)),
        ("text_body", text_or_missing(&record.text_body)),
        ("sentence_count", number_or_missing(record.sentence_count)),
        (
            "avg_sentence_length",
            number_or_missing(record.avg_sentence_length),
        ),
        ("vocabulary_band", text_or_missing(&record.vocabulary_band)),
        ("intended_use", text_or_missing(&record.intended_use)),
        ("created_date", text_or_missing(&record.created_date)),
        ("notes", text_or_missing(&record.notes)),
    ])
}

pub fn build_prompt(
    catalog: &Catalog,
    record: &ReadingTextRecord,
    task: TaskType,
    options: &PromptOptions,
) -> Result<String> {
    let mut values = record_values(record);
    values.insert("num_questions", options.num_questions.to_string());
    values.insert(
        "summary_length",
        (record.word_count.unwrap_or(100) / 3).max(30).to_string(),
    );

    if task == TaskType::GradedReader {
        let target = options.target_band.as_str();
        let target_age_group = catalog
            .band(target)
            .map(|band| band.age_group.as_str())
            .unwrap_or(DEFAULT_AGE_GROUP);
        values.insert("target_lexile", target.to_string());
        values.insert("target_age_group", target_age_group.to_string());
        values.insert("adaptation_rules", adaptation_rules(target).to_string());
        values.insert("target_word_count", target_word_count(target).to_string());
    }

    render_template(task.template(), &values)
}

pub fn export_header(record: &ReadingTextRecord, task: TaskType) -> String {
    format!(
        "# Task: {}\n# Text ID: {}\n# Lexile: {} ({})\n# Genre: {} | Topic: {}\n# Words: {}\n\n",
        task.title(),
        text_or_missing(&record.text_id),
        number_or_missing(record.score),
        text_or_missing(&record.band),
        text_or_missing(&record.genre),
        text_or_missing(&record.topic),
        number_or_missing(record.word_count),
    )
}

/// Header plus rendered prompt, as written to prompt files.
pub fn export_prompt(
    catalog: &Catalog,
    record: &ReadingTextRecord,
    task: TaskType,
    options: &PromptOptions,
) -> Result<String> {
    let prompt = build_prompt(catalog, record, task, options)?;
    Ok(format!("{}{prompt}", export_header(record, task)))
}

/// Parameters for writing a new passage into one catalog slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub genre: String,
    pub length_type: String,
    pub band: String,
    pub topic: Option<String>,
    pub age_group: String,
    pub vocabulary_band: Option<String>,
}

impl GenerationRequest {
    /// Request describing an empty slot; band and genre must be set.
    pub fn for_slot(record: &ReadingTextRecord) -> Option<Self> {
        let band = record.band.clone().filter(|band| !band.is_empty())?;
        let genre = record.genre.clone().filter(|genre| !genre.is_empty())?;
        Some(Self {
            genre,
            length_type: record
                .length_type
                .clone()
                .unwrap_or_else(|| "Short".to_string()),
            band,
            topic: record.topic.clone().filter(|topic| !topic.is_empty()),
            age_group: record
                .age_group
                .clone()
                .unwrap_or_else(|| DEFAULT_AGE_GROUP.to_string()),
            vocabulary_band: record.vocabulary_band.clone(),
        })
    }

    pub fn resolved_topic(&self, catalog: &Catalog) -> String {
        self.topic
            .clone()
            .unwrap_or_else(|| catalog.default_topic(&self.genre, &self.age_group))
    }
}

pub fn build_generation_prompt(catalog: &Catalog, request: &GenerationRequest) -> Result<String> {
    let Some(length) = catalog
        .length(&request.length_type)
        .or_else(|| catalog.length("Short"))
        .or_else(|| catalog.lengths.first())
    else {
        bail!("catalog defines no length types");
    };
    let instruction = catalog
        .genre(&request.genre)
        .map(|genre| genre.instruction.as_str())
        .unwrap_or("");

    let values = BTreeMap::from([
        ("lexile_band", request.band.clone()),
        ("genre", request.genre.clone()),
        ("instruction", instruction.to_string()),
        ("target_words", length.target_words.to_string()),
        ("word_range", length.range_label()),
        ("topic", request.resolved_topic(catalog)),
        ("age_group", request.age_group.clone()),
        (
            "vocabulary_band",
            request
                .vocabulary_band
                .clone()
                .filter(|band| !band.is_empty())
                .unwrap_or_else(|| "appropriate for the Lexile band".to_string()),
        ),
    ]);

    render_template(GENERATION_TEMPLATE, &values)
}

const GENERATION_TEMPLATE: &str = r#"You are an expert EFL (English as a Foreign Language) reading text writer for Korean students.

TASK: Generate a reading passage with the following specifications:

- **Lexile Band**: {lexile_band}
- **Genre**: {genre} - {instruction}
- **Target Word Count**: {target_words} words (acceptable range: {word_range} words)
- **Topic**: {topic}
- **Target Age Group**: {age_group}
- **Vocabulary Level**: {vocabulary_band}

CONSTRAINTS:
1. The text MUST be within the word count range ({word_range} words). This is critical.
2. Use vocabulary and sentence structures appropriate for Lexile {lexile_band}.
3. Content must be age-appropriate for {age_group} Korean students.
4. Avoid culturally sensitive, politically charged, or inappropriate content.
5. Use natural, authentic English - not simplified textbook English.
6. Each sentence should be clear and complete.

OUTPUT FORMAT (JSON only, no markdown code blocks):
{"text_body": "The full reading passage text here...", "sentence_count": <number>, "word_count": <number>, "vocabulary_notes": "Brief note on key vocabulary used", "lexile_estimate": <estimated Lexile score as number>}"#;

const COMPREHENSION_TEMPLATE: &str = r#"You are an expert EFL test item writer for Korean {age_group} students.

READING PASSAGE (Lexile {lexile_score}, {genre}, {word_count} words):
---
{text_body}
---

TASK: Create {num_questions} reading comprehension questions for this passage.

REQUIREMENTS:
- Target level: {vocabulary_band} (CEFR)
- Include a mix of question types:
  * 2 factual/detail questions
  * 1 inference question
  * 1 vocabulary-in-context question
  * 1 main idea/purpose question
- Each question must have 4 answer choices (A-D) with exactly 1 correct answer
- Distractors should be plausible but clearly wrong
- Use language appropriate for {age_group} Korean EFL students

OUTPUT FORMAT (JSON):
{
  "questions": [
    {
      "number": 1,
      "type": "factual|inference|vocabulary|main_idea",
      "question": "...",
      "choices": {"A": "...", "B": "...", "C": "...", "D": "..."},
      "answer": "A",
      "explanation": "Brief explanation of why this is correct"
    }
  ]
}"#;

const VOCABULARY_TEMPLATE: &str = r#"You are an expert EFL vocabulary instructor for Korean {age_group} students.

READING PASSAGE (Lexile {lexile_score}, {word_count} words):
---
{text_body}
---

TASK: Create vocabulary exercises based on this passage.

REQUIREMENTS:
- Select 8-10 key words/phrases from the passage
- Target CEFR level: {vocabulary_band}
- For each word, provide:
  1. The word as used in the passage (with the sentence)
  2. Korean translation
  3. English definition (student-friendly)
  4. Part of speech
  5. One example sentence (different context)
  6. A fill-in-the-blank exercise using that word

OUTPUT FORMAT (JSON):
{
  "vocabulary": [
    {
      "word": "...",
      "context_sentence": "The original sentence from the passage",
      "korean": "Korean translation",
      "definition": "Simple English definition",
      "pos": "noun/verb/adjective/adverb",
      "example": "A new example sentence",
      "exercise": "Fill in: The scientist ___ the data carefully. (answer: analyzed)"
    }
  ]
}"#;

const SUMMARY_TEMPLATE: &str = r#"You are an expert EFL writing instructor for Korean {age_group} students.

READING PASSAGE (Lexile {lexile_score}, {genre}, {word_count} words):
---
{text_body}
---

TASK: Create a scaffolded summary writing exercise for this passage.

PROVIDE:
1. **Key Sentence Identification**: List the 3-4 most important sentences from the passage
2. **Graphic Organizer**: A simple outline showing the text structure ({genre} structure)
3. **Sentence Starters**: 4-5 sentence starters students can use to write their summary
4. **Model Summary**: A sample summary (about {summary_length} words, appropriate for {vocabulary_band} level)
5. **Self-Check Rubric**: 3-4 criteria students can use to evaluate their own summary

OUTPUT FORMAT (JSON):
{
  "key_sentences": ["...", "..."],
  "organizer": {"type": "{genre}", "sections": [...]},
  "sentence_starters": ["...", "..."],
  "model_summary": "...",
  "rubric": ["...", "..."]
}"#;

const LESSON_PLAN_TEMPLATE: &str = r#"You are an expert EFL curriculum designer for Korean {age_group} students.

READING PASSAGE (Lexile {lexile_score}, {genre}, {word_count} words, Topic: {topic}):
---
{text_body}
---

TASK: Create a structured lesson plan using this reading passage.

LESSON PLAN STRUCTURE:
1. **Warm-up (5 min)**: Activating prior knowledge about "{topic}"
2. **Pre-reading (5 min)**: Key vocabulary preview (5 words), prediction activity
3. **While-reading (15 min)**:
   - First read: gist/main idea
   - Second read: detailed comprehension
   - Reading strategy focus (appropriate for {vocabulary_band} level)
4. **Post-reading (10 min)**: Discussion questions, personal connection activity
5. **Extension activity**: Homework or follow-up task
6. **Assessment**: 3 quick-check questions

Include specific instructions for the teacher, estimated timing, and materials needed.
Adapt all activities to a Korean EFL classroom context.

OUTPUT: Structured lesson plan in markdown format."#;

const CSAT_STYLE_TEMPLATE: &str = r#"You are an expert writer of Korean CSAT (college entrance exam) English items.

READING PASSAGE (Lexile {lexile_score}, {genre}, {word_count} words):
---
{text_body}
---

TASK: Create CSAT-style questions based on this passage.

Generate the following question types:
1. **Main Topic**: "What is the main topic of the passage?"
2. **Title**: "Which is the best title for the passage?"
3. **Main Point**: "What is the main point the author is making?"
4. **Fill in the Blank**: Remove a key phrase and ask students to infer it
5. **Sentence Ordering**: Rearrange 3 sentences from the passage

REQUIREMENTS:
- Follow the actual CSAT format exactly
- 5 answer choices (①-⑤) for each question
- Difficulty appropriate for Lexile {lexile_score}
- Include the Korean instruction line for each item as used in the actual exam

OUTPUT FORMAT (JSON):
{
  "questions": [
    {
      "type": "topic|title|main_point|blank|ordering",
      "instruction_kr": "Korean instruction as in the exam",
      "question": "...",
      "choices": ["①...", "②...", "③...", "④...", "⑤..."],
      "answer": "③",
      "explanation": "..."
    }
  ]
}"#;

const GRADED_READER_TEMPLATE: &str = r#"You are an expert EFL reading text adapter.

ORIGINAL PASSAGE (Lexile {lexile_score}, {word_count} words):
---
{text_body}
---

TASK: Rewrite this passage at Lexile {target_lexile} level ({target_age_group}).

ADAPTATION RULES FOR {target_lexile}:
{adaptation_rules}

REQUIREMENTS:
- Keep the SAME topic and core information
- Adjust vocabulary, sentence length, and complexity
- Target word count: {target_word_count} words
- Maintain natural, authentic English
- Content must remain age-appropriate for {target_age_group}

OUTPUT FORMAT (JSON):
{
  "adapted_text": "...",
  "word_count": <number>,
  "sentence_count": <number>,
  "changes_made": ["List of key changes: simplified X, replaced Y with Z, etc."],
  "lexile_estimate": <number>
}"#;

const DISCUSSION_TEMPLATE: &str = r#"You are an expert EFL discussion facilitator for Korean {age_group} students.

READING PASSAGE (Lexile {lexile_score}, {genre}, Topic: {topic}):
---
{text_body}
---

TASK: Generate discussion questions at three levels of thinking.

1. **Literal Level** (2 questions): Questions answered directly from the text
2. **Interpretive Level** (2 questions): Questions requiring inference and analysis
3. **Applied Level** (2 questions): Questions connecting the text to students' lives/opinions

REQUIREMENTS:
- Use language appropriate for {vocabulary_band} level
- Include sentence frames for students who need support
  (e.g., "I think... because...", "In my opinion...")
- Add a "Think-Pair-Share" activity prompt
- Include one creative response option (drawing, role-play, writing)

OUTPUT FORMAT (JSON):
{
  "literal": [{"question": "...", "sentence_frame": "..."}],
  "interpretive": [{"question": "...", "sentence_frame": "..."}],
  "applied": [{"question": "...", "sentence_frame": "..."}],
  "think_pair_share": "...",
  "creative_response": "..."
}"#;

const GRAMMAR_FOCUS_TEMPLATE: &str = r#"You are an expert EFL grammar instructor for Korean {age_group} students.

READING PASSAGE (Lexile {lexile_score}, {word_count} words):
---
{text_body}
---

TASK: Create grammar-in-context exercises based on this passage.

REQUIREMENTS:
1. Identify 3 key grammar patterns that appear in the passage
2. For each pattern:
   - Extract 2 example sentences from the passage
   - Explain the grammar rule simply (in English, with the Korean term in parentheses)
   - Provide 3 practice exercises (fill-in, rewrite, error correction)
   - Give 2 original sentences students can create using the pattern

Target grammar complexity: {vocabulary_band} (CEFR)

OUTPUT FORMAT (JSON):
{
  "grammar_points": [
    {
      "pattern": "Name of grammar pattern (Korean term)",
      "examples_from_text": ["...", "..."],
      "explanation": "Clear, simple rule explanation",
      "exercises": [
        {"type": "fill_in", "question": "...", "answer": "..."},
        {"type": "rewrite", "question": "...", "answer": "..."},
        {"type": "error_correction", "question": "...", "answer": "..."}
      ],
      "student_practice": "Create 2 sentences using this pattern about your own life."
    }
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ReadingTextRecord {
        ReadingTextRecord {
            text_id: Some("L700-NAR-006-001".to_string()),
            band: Some("700-900".to_string()),
            score: Some(780),
            age_group: Some("Middle School".to_string()),
            genre: Some("Narrative".to_string()),
            topic: Some("Friendship".to_string()),
            word_count: Some(120),
            length_type: Some("Short".to_string()),
            text_body: Some("Mina waited at the gate.".to_string()),
            vocabulary_band: Some("A2/B1".to_string()),
            ..ReadingTextRecord::default()
        }
    }

    const ALL_TASKS: [TaskType; 8] = [
        TaskType::Comprehension,
        TaskType::Vocabulary,
        TaskType::Summary,
        TaskType::LessonPlan,
        TaskType::CsatStyle,
        TaskType::GradedReader,
        TaskType::Discussion,
        TaskType::GrammarFocus,
    ];

    #[test]
    fn every_task_renders_without_leftover_placeholders() {
        let catalog = Catalog::standard();
        for task in ALL_TASKS {
            let prompt = build_prompt(&catalog, &sample_record(), task, &PromptOptions::default())
                .unwrap_or_else(|err| panic!("{} should render: {err}", task.as_str()));
            assert!(prompt.contains("Mina waited at the gate."), "{}", task.as_str());
            assert!(
                !placeholder_regex().is_match(&prompt),
                "{} left placeholders",
                task.as_str()
            );
        }
    }

    #[test]
    fn comprehension_uses_requested_question_count() {
        let catalog = Catalog::standard();
        let options = PromptOptions {
            num_questions: 8,
            ..PromptOptions::default()
        };
        let prompt =
            build_prompt(&catalog, &sample_record(), TaskType::Comprehension, &options)
                .expect("prompt should render");
        assert!(prompt.contains("Create 8 reading comprehension questions"));
        assert!(prompt.contains("Lexile 780, Narrative, 120 words"));
    }

    #[test]
    fn summary_length_has_a_floor_of_thirty_words() {
        let catalog = Catalog::standard();
        let options = PromptOptions::default();

        let prompt = build_prompt(&catalog, &sample_record(), TaskType::Summary, &options)
            .expect("prompt should render");
        assert!(prompt.contains("about 40 words"));

        let short = ReadingTextRecord {
            word_count: Some(45),
            ..sample_record()
        };
        let prompt = build_prompt(&catalog, &short, TaskType::Summary, &options)
            .expect("prompt should render");
        assert!(prompt.contains("about 30 words"));
    }

    #[test]
    fn graded_reader_pulls_target_band_details() {
        let catalog = Catalog::standard();
        let options = PromptOptions {
            target_band: "300-500".to_string(),
            ..PromptOptions::default()
        };
        let prompt = build_prompt(&catalog, &sample_record(), TaskType::GradedReader, &options)
            .expect("prompt should render");
        assert!(prompt.contains("Rewrite this passage at Lexile 300-500 level (Upper Elementary)"));
        assert!(prompt.contains("Target word count: 100 words"));
        assert!(prompt.contains("Use 'because', 'so', 'but'."));

        let unknown = PromptOptions {
            target_band: "2000-2200".to_string(),
            ..PromptOptions::default()
        };
        let prompt = build_prompt(&catalog, &sample_record(), TaskType::GradedReader, &unknown)
            .expect("prompt should render");
        assert!(prompt.contains("(Middle School)"));
        assert!(prompt.contains("Target word count: 200 words"));
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let values = BTreeMap::from([("genre", "Narrative".to_string())]);
        let error = render_template("{genre} about {weather}", &values)
            .expect_err("unknown placeholder should fail");
        assert!(error.to_string().contains("{weather}"));

        let rendered = render_template(r#"{"genre": "{genre}"}"#, &values)
            .expect("json braces should pass through");
        assert_eq!(rendered, r#"{"genre": "Narrative"}"#);
    }

    #[test]
    fn export_header_lists_record_summary() {
        let document = export_prompt(
            &Catalog::standard(),
            &sample_record(),
            TaskType::LessonPlan,
            &PromptOptions::default(),
        )
        .expect("export should render");
        assert!(document.starts_with(
            "# Task: Lesson Plan\n# Text ID: L700-NAR-006-001\n# Lexile: 780 (700-900)\n"
        ));
        assert!(document.contains("# Genre: Narrative | Topic: Friendship\n# Words: 120\n\n"));
    }

    #[test]
    fn missing_fields_render_as_placeholder_text() {
        let record = ReadingTextRecord {
            topic: None,
            score: None,
            ..sample_record()
        };
        let prompt = build_prompt(
            &Catalog::standard(),
            &record,
            TaskType::Discussion,
            &PromptOptions::default(),
        )
        .expect("prompt should render");
        assert!(prompt.contains("Lexile n/a, Narrative, Topic: n/a"));
    }

    #[test]
    fn generation_prompt_uses_catalog_targets_and_default_topic() {
        let catalog = Catalog::standard();
        let request = GenerationRequest {
            genre: "Procedural".to_string(),
            length_type: "Medium".to_string(),
            band: "700-900".to_string(),
            topic: None,
            age_group: "Middle School".to_string(),
            vocabulary_band: None,
        };
        let prompt = build_generation_prompt(&catalog, &request).expect("prompt should render");
        assert!(prompt.contains("**Topic**: Cooking"));
        assert!(prompt.contains("200 words (acceptable range: 170-230 words)"));
        assert!(prompt.contains("step-by-step instructions"));
        assert!(prompt.contains("appropriate for the Lexile band"));

        let unknown_length = GenerationRequest {
            length_type: "Epic".to_string(),
            ..request
        };
        let prompt =
            build_generation_prompt(&catalog, &unknown_length).expect("prompt should render");
        assert!(prompt.contains("100 words (acceptable range: 80-120 words)"));
    }

    #[test]
    fn slot_request_requires_band_and_genre() {
        let slot = ReadingTextRecord {
            text_body: None,
            topic: Some(String::new()),
            ..sample_record()
        };
        let request = GenerationRequest::for_slot(&slot).expect("slot should map to a request");
        assert_eq!(request.length_type, "Short");
        assert!(request.topic.is_none());

        let no_genre = ReadingTextRecord {
            genre: None,
            ..slot
        };
        assert!(GenerationRequest::for_slot(&no_genre).is_none());
    }
}

use tracing::{debug, info};

use crate::config::LessonConfig;
use crate::error::{Error, Result};
use crate::llm::LanguageModel;
use crate::utils::{chunk_words, list_items};

const PLAN_TABLE_HEADER: &str = "| Period No | Topics to be Covered |\n|-----------|----------------------|";

/// Builds a period-by-period lesson plan from extracted chapter text
pub struct LessonPlanGenerator<M> {
    model: M,
    config: LessonConfig,
}

impl<M: LanguageModel> LessonPlanGenerator<M> {
    pub fn new(model: M, config: LessonConfig) -> Self {
        Self { model, config }
    }

    /// Markdown lesson plan covering `chapter_text` over `periods` periods
    ///
    /// The text is treated as loose lines with no sentence structure.
    pub fn generate(&self, chapter_text: &str, periods: u32, class_level: Option<&str>) -> Result<String> {
        if chapter_text.trim().is_empty() {
            return Err(Error::Config("chapter text is empty; nothing to plan".into()));
        }
        if periods == 0 {
            return Err(Error::Config("a lesson plan needs at least one period".into()));
        }

        let prompt = if self.config.extract_subtopics {
            let subtopics = self.subtopics(chapter_text)?;
            info!("Collected {} subtopics", subtopics.len());
            plan_prompt(periods, class_level, "Key Subtopics", &subtopics.join("\n"))
        } else {
            plan_prompt(periods, class_level, "Chapter Content", chapter_text)
        };

        let plan = self.model.complete(&prompt)?;
        Ok(plan.trim().to_string())
    }

    fn subtopics(&self, chapter_text: &str) -> Result<Vec<String>> {
        let chunks = chunk_words(chapter_text, self.config.chunk_words);
        debug!("Chapter text split into {} chunks", chunks.len());

        let mut subtopics = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let reply = self.model.complete(&subtopic_prompt(chunk))?;
            let items = list_items(&reply);
            debug!("Chunk {}: {} subtopics", i + 1, items.len());
            subtopics.extend(items);
        }
        Ok(subtopics)
    }
}

fn subtopic_prompt(chunk: &str) -> String {
    format!(
        r#"Identify the most important subtopics from the following chapter content.
Ensure each subtopic is concise and meaningful.

Chapter Content:
{chunk}

Output format:
- Subtopic 1
- Subtopic 2
- Subtopic 3
"#
    )
}

fn plan_prompt(periods: u32, class_level: Option<&str>, section: &str, body: &str) -> String {
    let audience = class_level
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .map(|level| format!(", for class level {}", level))
        .unwrap_or_default();

    format!(
        r#"Create a structured lesson plan for the following chapter content, divided into {periods} periods{audience}.
Ensure each period evenly covers the topics and provides key points in 2-3 lines.

{section}:
{body}

Output format:
{PLAN_TABLE_HEADER}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    const TABLE: &str = "| Period No | Topics to be Covered |\n|---|---|\n| 1 | Cells |";

    fn config(chunk_words: usize, extract_subtopics: bool) -> LessonConfig {
        LessonConfig {
            chunk_words,
            extract_subtopics,
        }
    }

    #[test]
    fn test_subtopics_are_chained_into_plan() {
        let model = ScriptedModel::new(vec![
            Ok("- Cell membrane\n- Nucleus".to_string()),
            Ok("* Mitochondria".to_string()),
            Ok(format!("  {}\n", TABLE)),
        ]);
        let generator = LessonPlanGenerator::new(&model, config(3, true));

        let plan = generator
            .generate("one two three four five", 4, Some("IX"))
            .unwrap();
        assert_eq!(plan, TABLE);

        let prompts = model.prompts.borrow();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("one two three"));
        assert!(prompts[1].contains("four five"));
        assert!(prompts[2].contains("Cell membrane\nNucleus\nMitochondria"));
        assert!(prompts[2].contains("divided into 4 periods, for class level IX."));
        assert!(prompts[2].contains("| Period No | Topics to be Covered |"));
    }

    #[test]
    fn test_single_prompt_mode() {
        let model = ScriptedModel::replying(TABLE);
        let generator = LessonPlanGenerator::new(&model, config(3, false));

        let plan = generator.generate("Cells\nTissues\nOrgans", 2, None).unwrap();
        assert_eq!(plan, TABLE);

        let prompts = model.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Chapter Content:\nCells\nTissues\nOrgans"));
        assert!(prompts[0].contains("divided into 2 periods."));
    }

    #[test]
    fn test_blank_class_level_is_omitted() {
        let prompt = plan_prompt(3, Some("  "), "Key Subtopics", "Cells");
        assert!(prompt.contains("divided into 3 periods.\n"));
    }

    #[test]
    fn test_rejects_empty_text_and_zero_periods() {
        let model = ScriptedModel::replying(TABLE);
        let generator = LessonPlanGenerator::new(&model, LessonConfig::default());

        assert!(matches!(generator.generate("  \n", 3, None), Err(Error::Config(_))));
        assert!(matches!(generator.generate("Cells", 0, None), Err(Error::Config(_))));
        assert_eq!(model.prompt_count(), 0);
    }

    #[test]
    fn test_subtopic_failure_stops_generation() {
        let model = ScriptedModel::new(vec![Err(Error::Timeout { attempts: 4 })]);
        let generator = LessonPlanGenerator::new(&model, config(2, true));

        assert!(matches!(
            generator.generate("a b c d", 1, None),
            Err(Error::Timeout { attempts: 4 })
        ));
        assert_eq!(model.prompt_count(), 1);
    }
}

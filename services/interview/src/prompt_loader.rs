use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Templates the interviewer client cannot run without.
pub const REQUIRED_PROMPTS: [&str; 4] = [
    "resume_analysis",
    "question_generation",
    "interview_scoring",
    "speech_style",
];

/// Loads every `.md` file in the directory as a prompt template, keyed by
/// file stem, and verifies the required templates are all present.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content);
        }
    }

    for key in REQUIRED_PROMPTS {
        if !prompts.contains_key(key) {
            bail!(
                "Missing prompt template {key}.md in {}",
                dir_path.display()
            );
        }
    }

    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_required(dir: &Path) -> Result<()> {
        for key in REQUIRED_PROMPTS {
            let mut file = File::create(dir.join(format!("{key}.md")))?;
            writeln!(file, "Template for {key}: {{job_description}}")?;
        }
        Ok(())
    }

    #[test]
    fn loads_markdown_templates_only() -> Result<()> {
        let dir = tempdir()?;
        write_required(dir.path())?;

        // These must be ignored: wrong extension, and a subdirectory.
        let mut ignored = File::create(dir.path().join("notes.txt"))?;
        writeln!(ignored, "not a prompt")?;
        std::fs::create_dir(dir.path().join("subdir"))?;

        let prompts = load_prompts(dir.path())?;

        assert_eq!(prompts.len(), REQUIRED_PROMPTS.len());
        assert_eq!(
            prompts.get("speech_style").unwrap(),
            "Template for speech_style: {job_description}\n"
        );
        assert!(prompts.get("notes").is_none());
        Ok(())
    }

    #[test]
    fn missing_required_template_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        write_required(dir.path())?;
        std::fs::remove_file(dir.path().join("interview_scoring.md"))?;

        let err = load_prompts(dir.path()).unwrap_err();
        assert!(err.to_string().contains("interview_scoring"));
        Ok(())
    }

    #[test]
    fn nonexistent_directory_is_an_error() {
        let result = load_prompts(Path::new("nonexistent_prompt_dir_for_tests"));
        assert!(result.is_err());
    }
}

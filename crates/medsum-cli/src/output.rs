use std::io::Write;

use medsum_core::render::{
    EMPTY_CONTENT_WARNING, entity_line, markdown_report, markdown_warning, status_message,
};
use medsum_core::{Analysis, EntityAnnotation, Summary};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Report layout selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Markdown,
    Json,
}

/// Print the "processing" line shown before any work starts.
pub fn print_status(w: &mut dyn Write, disease_name: &str, color: ColorMode) -> std::io::Result<()> {
    let status = status_message(disease_name);
    if color.enabled() {
        writeln!(w, "{}", status.cyan())?;
    } else {
        writeln!(w, "{}", status)?;
    }
    writeln!(w)
}

pub fn print_warning(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", EMPTY_CONTENT_WARNING.yellow())
    } else {
        writeln!(w, "{}", EMPTY_CONTENT_WARNING)
    }
}

fn print_heading(w: &mut dyn Write, heading: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", heading.bold())
    } else {
        writeln!(w, "{}", heading)
    }
}

pub fn print_summary(w: &mut dyn Write, summary: &Summary, color: ColorMode) -> std::io::Result<()> {
    print_heading(w, "Summary", color)?;
    match summary {
        Summary::Generated(text) => {
            if color.enabled() {
                writeln!(w, "{}", "Summary Ready!".green())?;
            } else {
                writeln!(w, "Summary Ready!")?;
            }
            writeln!(w, "{}", text)?;
        }
        Summary::NotEnoughText => {
            if color.enabled() {
                writeln!(w, "{}", summary.as_str().dimmed())?;
            } else {
                writeln!(w, "{}", summary.as_str())?;
            }
        }
    }
    writeln!(w)
}

pub fn print_entities(
    w: &mut dyn Write,
    entities: &[EntityAnnotation],
    color: ColorMode,
) -> std::io::Result<()> {
    print_heading(w, "Biomedical Named Entities", color)?;
    if entities.is_empty() {
        writeln!(w, "(none found)")?;
    }
    for entity in entities {
        if color.enabled() {
            writeln!(
                w,
                "- **{}**: {} (score: {})",
                entity.label.bold(),
                entity.text,
                format!("{:.2}", entity.score).dimmed()
            )?;
        } else {
            writeln!(w, "{}", entity_line(entity))?;
        }
    }
    Ok(())
}

/// Print a finished analysis in the requested format.
pub fn print_analysis(
    w: &mut dyn Write,
    analysis: &Analysis,
    format: Format,
    color: ColorMode,
) -> anyhow::Result<()> {
    match format {
        Format::Text => {
            print_summary(w, &analysis.summary, color)?;
            print_entities(w, &analysis.entities, color)?;
        }
        Format::Markdown => write!(w, "{}", markdown_report(analysis))?,
        Format::Json => writeln!(w, "{}", serde_json::to_string_pretty(analysis)?)?,
    }
    Ok(())
}

/// Print the empty-document warning in the requested format.
pub fn print_empty_content(
    w: &mut dyn Write,
    disease_name: &str,
    format: Format,
    color: ColorMode,
) -> anyhow::Result<()> {
    match format {
        Format::Text => print_warning(w, color)?,
        Format::Markdown => write!(w, "{}", markdown_warning(disease_name))?,
        Format::Json => {
            let value = serde_json::json!({
                "disease_name": disease_name,
                "status": status_message(disease_name),
                "summary": null,
                "entities": [],
                "warning": EMPTY_CONTENT_WARNING,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&value)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(summary: Summary) -> Analysis {
        Analysis {
            disease_name: "Tuberculosis".into(),
            text_chars: 120,
            summary,
            entities: vec![
                EntityAnnotation::new("Disease_disorder", "tuberculosis", 0.991),
                EntityAnnotation::new("Sign_symptom", "cough", 0.456),
            ],
        }
    }

    fn render(analysis: &Analysis, format: Format) -> String {
        let mut buf = Vec::new();
        print_analysis(&mut buf, analysis, format, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_output_uses_entity_lines() {
        let out = render(&analysis(Summary::Generated("A summary.".into())), Format::Text);
        assert!(out.contains("Summary Ready!\nA summary.\n"));
        assert!(out.contains("- **Disease_disorder**: tuberculosis (score: 0.99)\n"));
        assert!(out.contains("- **Sign_symptom**: cough (score: 0.46)\n"));
    }

    #[test]
    fn sentinel_is_printed_without_ready_banner() {
        let out = render(&analysis(Summary::NotEnoughText), Format::Text);
        assert!(out.contains("Not enough text to summarize."));
        assert!(!out.contains("Summary Ready!"));
    }

    #[test]
    fn json_output_round_trips_entities() {
        let out = render(&analysis(Summary::Generated("S".into())), Format::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["disease_name"], "Tuberculosis");
        assert_eq!(value["summary"]["kind"], "generated");
        assert_eq!(value["entities"][1]["label"], "Sign_symptom");
    }

    #[test]
    fn json_output_carries_sentinel_text() {
        let out = render(&analysis(Summary::NotEnoughText), Format::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["kind"], "not_enough_text");
        assert_eq!(value["summary"]["text"], "Not enough text to summarize.");
    }

    #[test]
    fn empty_content_is_valid_json() {
        let mut buf = Vec::new();
        print_empty_content(&mut buf, "Cholera", Format::Json, ColorMode(false)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["warning"], "No valid text found in the PDF.");
        assert_eq!(value["disease_name"], "Cholera");
        assert!(value["summary"].is_null());
        assert_eq!(value["entities"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn empty_content_markdown_has_warning_quote() {
        let mut buf = Vec::new();
        print_empty_content(&mut buf, "Cholera", Format::Markdown, ColorMode(false)).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("> No valid text found in the PDF."));
    }

    #[test]
    fn colored_entity_line_keeps_bold_markers() {
        let entities = [EntityAnnotation::new("Sign_symptom", "cough", 0.456)];
        let mut buf = Vec::new();
        print_entities(&mut buf, &entities, ColorMode(true)).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let line = out.lines().find(|l| l.starts_with("- ")).unwrap();
        assert!(line.starts_with("- **"));
        assert!(line.contains("Sign_symptom"));
        assert!(line.contains("**: cough (score: "));
        assert!(line.contains("0.46"));
    }

    #[test]
    fn markdown_output_has_sections() {
        let out = render(&analysis(Summary::Generated("S".into())), Format::Markdown);
        assert!(out.contains("## Summary"));
        assert!(out.contains("## Biomedical Named Entities"));
    }

    #[test]
    fn status_and_warning_lines() {
        let mut buf = Vec::new();
        print_status(&mut buf, "Cholera", ColorMode(false)).unwrap();
        print_warning(&mut buf, ColorMode(false)).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(
            out,
            "Processing file for disease: Cholera\n\nNo valid text found in the PDF.\n"
        );
    }
}

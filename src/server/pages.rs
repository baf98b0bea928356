//! HTML pages for the browser front end.
//!
//! Pages are small and static apart from a handful of values, so they are
//! assembled with `format!`; every interpolated value goes through
//! [`escape_html`].

use crate::error::AbstractorError;
use crate::language::LanguageOption;
use crate::output::{AbstractOutput, PartialOutput};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 52rem; margin: 2rem auto; padding: 0 1rem; line-height: 1.5; color: #222; }
header a { color: inherit; text-decoration: none; }
form { display: grid; gap: .75rem; max-width: 28rem; margin: 1.5rem 0; }
button { padding: .5rem 1rem; cursor: pointer; }
section { border-top: 1px solid #ddd; padding-top: 1rem; margin-top: 1.5rem; }
.summary { white-space: pre-wrap; }
.error { background: #fdecea; border: 1px solid #f5c2c0; padding: .75rem 1rem; border-radius: 4px; }
.muted { color: #666; font-size: .9rem; }
"#;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<header><h1><a href="/">PDF Abstractor</a></h1></header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

/// Landing page.
pub fn index_page() -> String {
    layout(
        "PDF Abstractor",
        r#"<p>Upload a PDF document to get a short abstractive summary, a translation
of that summary into another language, and spoken audio of both.</p>
<p><a href="/abstractor">Summarize a document &rarr;</a></p>"#,
    )
}

fn upload_form(languages: &[LanguageOption], selected: Option<&str>) -> String {
    let options: String = languages
        .iter()
        .map(|l| {
            let sel = if Some(l.code.as_str()) == selected {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{code}"{sel}>{name} ({code})</option>"#,
                code = escape_html(l.code.as_str()),
                name = escape_html(&l.name),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<form action="/abstractor" method="post" enctype="multipart/form-data">
<label>PDF document <input type="file" name="pdf_file" accept="application/pdf,.pdf" required></label>
<label>Translate summary into
<select name="target_lang" required>
{options}
</select></label>
<button type="submit">Summarize</button>
</form>"#
    )
}

/// The upload form.
pub fn form_page(languages: &[LanguageOption]) -> String {
    layout(
        "Summarize a PDF",
        &format!(
            "<h2>Summarize a PDF</h2>\n{}",
            upload_form(languages, Some("es"))
        ),
    )
}

fn audio_player(url: &str) -> String {
    format!(
        r#"<audio controls preload="none" src="{url}"></audio>
<p class="muted"><a href="{url}" download>Download MP3</a></p>"#,
        url = escape_html(url)
    )
}

/// Both summaries with their audio players, then the form again.
pub fn result_page(output: &AbstractOutput, languages: &[LanguageOption]) -> String {
    let target = &output.translation.target_language;
    let body = format!(
        r#"<section>
<h2>Summary ({source_name})</h2>
<p class="summary">{summary}</p>
{summary_audio}
</section>
<section>
<h2>Translated summary ({target_name})</h2>
<p class="summary">{translation}</p>
{translation_audio}
</section>
<p class="muted">{pages} page(s) processed in {secs:.1}s{truncated}.</p>
<section>
<h2>Summarize another document</h2>
{form}
</section>"#,
        source_name = escape_html(&output.summary.language.english_name()),
        summary = escape_html(&output.summary.text),
        summary_audio = audio_player(&output.summary_audio.url),
        target_name = escape_html(&target.english_name()),
        translation = escape_html(&output.translation.text),
        translation_audio = audio_player(&output.translation_audio.url),
        pages = output.page_count,
        secs = output.stats.total_ms as f64 / 1000.0,
        truncated = if output.summary.input_truncated {
            "; only the beginning of the document was summarized"
        } else {
            ""
        },
        form = upload_form(languages, Some(target.as_str())),
    );
    layout("Summary", &body)
}

/// The failed stage, the error, any partial result, and the form again.
pub fn error_page(
    error: &AbstractorError,
    partial: &PartialOutput,
    languages: &[LanguageOption],
    selected: Option<&str>,
) -> String {
    let mut body = format!(
        r#"<div class="error">
<h2>Something went wrong during {stage}</h2>
<p>{message}</p>
</div>"#,
        stage = escape_html(error.stage().label()),
        message = escape_html(&error.to_string()).replace('\n', "<br>"),
    );

    if let Some(ref summary) = partial.summary {
        body.push_str(&format!(
            r#"
<section>
<h2>Summary ({})</h2>
<p class="summary">{}</p>
</section>"#,
            escape_html(&summary.language.english_name()),
            escape_html(&summary.text)
        ));
    }
    if let Some(ref translation) = partial.translation {
        body.push_str(&format!(
            r#"
<section>
<h2>Translated summary ({})</h2>
<p class="summary">{}</p>
</section>"#,
            escape_html(&translation.target_language.english_name()),
            escape_html(&translation.text)
        ));
    }

    body.push_str(&format!(
        "\n<section>\n<h2>Try again</h2>\n{}\n</section>",
        upload_form(languages, selected)
    ));
    layout("Error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageCode;
    use crate::output::Summary;

    fn langs() -> Vec<LanguageOption> {
        vec![
            LanguageOption {
                code: LanguageCode::new("de"),
                name: "German".into(),
            },
            LanguageOption {
                code: LanguageCode::new("es"),
                name: "Spanish".into(),
            },
        ]
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn form_lists_languages_and_preselects() {
        let html = form_page(&langs());
        assert!(html.contains(r#"name="pdf_file""#));
        assert!(html.contains(r#"<option value="es" selected>Spanish (es)</option>"#));
        assert!(html.contains(r#"<option value="de">German (de)</option>"#));
    }

    #[test]
    fn error_page_shows_stage_and_partial_summary() {
        let err = AbstractorError::TranslationFailed {
            target: "de".into(),
            reason: "backend down".into(),
            source: None,
        };
        let partial = PartialOutput {
            page_count: Some(2),
            summary: Some(Summary {
                text: "The <parties> agree.".into(),
                language: "en".into(),
                input_truncated: false,
            }),
            translation: None,
        };
        let html = error_page(&err, &partial, &langs(), Some("de"));
        assert!(html.contains("during translation"));
        assert!(html.contains("The &lt;parties&gt; agree."));
        assert!(html.contains(r#"<option value="de" selected>"#));
        assert!(html.contains(r#"action="/abstractor""#));
    }
}

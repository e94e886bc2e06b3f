use std::path::{Path, PathBuf};

use crate::strategies::ArchitectureKind;

/// Replace the characters that would let an answer break out of its tag
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Build the self-contained report page. The answer is shown verbatim inside
/// a `<pre>` block, so whitespace and code formatting survive.
pub fn render_report(architecture: ArchitectureKind, final_answer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AI Response Report</title>
    <style>
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background-color: #f0f2f5;
            margin: 0;
            padding: 20px;
            display: flex;
            justify-content: center;
            align-items: flex-start;
            min-height: 100vh;
        }}
        .container {{
            background-color: #ffffff;
            border-radius: 12px;
            box-shadow: 0 4px 12px rgba(0, 0, 0, 0.1);
            max-width: 800px;
            width: 100%;
            padding: 30px 40px;
        }}
        h1 {{
            color: #1a73e8;
            text-align: center;
        }}
        .intro {{
            color: #5f6368;
            line-height: 1.6;
        }}
        pre {{
            background-color: #282c34;
            color: #abb2bf;
            border-radius: 8px;
            padding: 20px;
            overflow-x: auto;
            white-space: pre-wrap;
            word-wrap: break-word;
            line-height: 1.5;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>✨ AI Response Report ✨</h1>
        <p class="intro">📄 This report presents the findings from the Model Council system, utilizing the <strong>{label}</strong> architecture.</p>
        <pre>{answer}</pre>
    </div>
</body>
</html>
"#,
        label = architecture.label(),
        answer = escape_html(final_answer),
    )
}

/// Write `report.html` under `out_dir`, creating the directory if needed,
/// and return the path written
pub async fn write_report(
    out_dir: &Path,
    architecture: ArchitectureKind,
    final_answer: &str,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(out_dir).await?;
    let path = out_dir.join("report.html");
    tokio::fs::write(&path, render_report(architecture, final_answer)).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn report_names_the_architecture_and_keeps_the_answer() {
        let page = render_report(ArchitectureKind::Duopoly, "Use a binary search.");
        assert!(page.contains("<strong>Duopoly</strong>"));
        assert!(page.contains("<pre>Use a binary search.</pre>"));
        assert!(page.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn an_answer_with_markup_cannot_escape_the_pre_block() {
        let page = render_report(ArchitectureKind::King, "</pre><script>alert(1)</script>");
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;/pre&gt;&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[tokio::test]
    async fn writes_the_page_under_the_output_directory() {
        let out_dir = std::env::temp_dir().join(format!("council_report_{}", Uuid::new_v4()));

        let path = write_report(&out_dir, ArchitectureKind::Democracy, "final text")
            .await
            .unwrap();
        assert_eq!(path, out_dir.join("report.html"));

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("<strong>Democracy</strong>"));
        assert!(written.contains("final text"));

        tokio::fs::remove_dir_all(&out_dir).await.unwrap();
    }
}

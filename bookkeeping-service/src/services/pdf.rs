//! PDF rendering collaborator.
//!
//! Production rendering shells out to a headless browser binary that prints
//! an HTML template filled with invoice data. Environments without a browser
//! (development, CI) fall back to a minimal single-page renderer so invoice
//! creation still works end to end.

use async_trait::async_trait;
use serde_json::Value;
use service_core::error::AppError;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument};

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Render the named template with a key-value data map to PDF bytes.
    async fn render(&self, template: &str, data: &Value) -> Result<Vec<u8>, AppError>;
}

/// Renders via a headless Chromium `--print-to-pdf` invocation.
pub struct HeadlessBrowserRenderer {
    browser_bin: String,
    template_dir: PathBuf,
}

impl HeadlessBrowserRenderer {
    pub fn new(browser_bin: impl Into<String>, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            browser_bin: browser_bin.into(),
            template_dir: template_dir.into(),
        }
    }

    fn fill_template(template_html: &str, data: &Value) -> String {
        // `{{key}}` placeholders replaced from the flat data map.
        let mut html = template_html.to_string();
        if let Some(map) = data.as_object() {
            for (key, value) in map {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                html = html.replace(&format!("{{{{{}}}}}", key), &rendered);
            }
        }
        html
    }
}

#[async_trait]
impl PdfRenderer for HeadlessBrowserRenderer {
    #[instrument(skip(self, data))]
    async fn render(&self, template: &str, data: &Value) -> Result<Vec<u8>, AppError> {
        let template_path = self.template_dir.join(template);
        let template_html = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!(
                    "Failed to read template {}: {}",
                    template_path.display(),
                    e
                ))
            })?;

        let html = Self::fill_template(&template_html, data);

        let workdir = tempfile_dir().await?;
        let html_path = workdir.join("input.html");
        let pdf_path = workdir.join("output.pdf");
        tokio::fs::write(&html_path, html).await?;

        let output = Command::new(&self.browser_bin)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg(format!("--print-to-pdf={}", pdf_path.display()))
            .arg(format!("file://{}", html_path.display()))
            .output()
            .await
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!(
                    "Failed to spawn {}: {}",
                    self.browser_bin,
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "PDF rendering failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let bytes = tokio::fs::read(&pdf_path).await?;
        tokio::fs::remove_dir_all(&workdir).await.ok();

        debug!(bytes = bytes.len(), "PDF rendered");

        Ok(bytes)
    }
}

async fn tempfile_dir() -> Result<PathBuf, AppError> {
    let dir = std::env::temp_dir().join(format!("pdf-render-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Fallback renderer producing a valid one-page PDF listing the data map as
/// text. Good enough for development and integration tests; never used when
/// a browser binary is configured.
#[derive(Default)]
pub struct MinimalPdfRenderer;

impl MinimalPdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfRenderer for MinimalPdfRenderer {
    async fn render(&self, template: &str, data: &Value) -> Result<Vec<u8>, AppError> {
        let mut text = format!("{}\n", template);
        if let Some(map) = data.as_object() {
            for (key, value) in map {
                text.push_str(&format!("{}: {}\n", key, value));
            }
        }

        // Escape the two characters PDF string literals reserve.
        let escaped = text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)");
        let mut stream = String::from("BT /F1 10 Tf 50 780 Td 12 TL\n");
        for line in escaped.lines() {
            stream.push_str(&format!("({}) Tj T*\n", line));
        }
        stream.push_str("ET");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }

        let xref_offset = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{:010} 00000 n \n", offset));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        ));

        Ok(pdf.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn minimal_renderer_produces_pdf_bytes() {
        let renderer = MinimalPdfRenderer::new();
        let bytes = renderer
            .render(
                "invoice.html",
                &json!({"invoiceNo": "INV-2025-0001", "amount": "1000"}),
            )
            .await
            .unwrap();

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn template_placeholders_are_filled() {
        let html = HeadlessBrowserRenderer::fill_template(
            "<p>{{partnerName}} owes {{amount}}</p>",
            &json!({"partnerName": "Acme", "amount": 1000}),
        );
        assert_eq!(html, "<p>Acme owes 1000</p>");
    }
}

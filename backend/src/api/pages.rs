//! Server-rendered HTML for the upload form and the download page.

use crate::models::ConversionSummary;

/// Bootstrap alert category of a flash notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Warning,
    Danger,
}

impl FlashLevel {
    fn css_class(self) -> &'static str {
        match self {
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

/// One-shot message shown on the next form render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Warning, message: message.into() }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Danger, message: message.into() }
    }
}

const HEAD: &str = r#"<!doctype html>
<html lang="es">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet">
{extra}</head>
"#;

const FOOT: &str = r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/js/bootstrap.bundle.min.js"></script>
</body>
</html>
"#;

fn head(title: &str, extra: &str) -> String {
    HEAD.replace("{title}", title).replace("{extra}", extra)
}

/// Upload form, with an optional flash banner.
pub fn index_page(flash: Option<&Flash>) -> String {
    let banner = flash
        .map(|f| {
            format!(
                "  <div class=\"alert alert-{}\">{}</div>\n",
                f.level.css_class(),
                escape_html(&f.message)
            )
        })
        .unwrap_or_default();

    format!(
        r#"{head}<body class="bg-light">
<div class="container py-4">
  <h1 class="h3 mb-3">Excel → JSON</h1>
  <p class="text-muted">Sube tu archivo .xlsx, elige la hoja (opcional) y se <strong>descargará el JSON automáticamente</strong>.</p>
{banner}  <form class="card p-3 mb-4" action="/convert" method="post" enctype="multipart/form-data">
    <div class="mb-3">
      <label for="file" class="form-label">Archivo Excel (.xlsx)</label>
      <input class="form-control" type="file" id="file" name="file" accept=".xlsx" required>
    </div>
    <div class="mb-3">
      <label for="sheet_name" class="form-label">Nombre de hoja (opcional)</label>
      <input class="form-control" type="text" id="sheet_name" name="sheet_name" placeholder="Hoja 1">
      <div class="form-text">Si lo dejas vacío, tomaremos la <em>primera hoja</em> encontrada.</div>
    </div>
    <button class="btn btn-primary" type="submit">Convertir y descargar</button>
  </form>
</div>
{foot}"#,
        head = head("Excel → JSON", ""),
        banner = banner,
        foot = FOOT,
    )
}

/// Summary page that starts the download on load.
pub fn success_page(meta: &ConversionSummary, download_name: &str) -> String {
    let script = r#"  <script>
    document.addEventListener('DOMContentLoaded', function(){
      const link = document.getElementById('download-link');
      if (link) link.click();
    });
  </script>
"#;

    format!(
        r#"{head}<body class="bg-light">
<div class="container py-4">
  <div class="alert alert-success">
    <strong>¡Listo!</strong> Se encontraron <strong>{total}</strong> productos en el Excel.
    Con <strong>{in_stock} articulos en EXISTENCIA = SI</strong>.
  </div>

  <a id="download-link" class="btn btn-success me-2" href="/download/{href}">Descargar JSON</a>
  <a class="btn btn-outline-secondary" href="/">Subir otro archivo</a>

  <p class="text-muted small mt-3">Hoja usada: <strong>{sheet}</strong>. Registros filtrados: <strong>{output}</strong>. Columna de existencias: <strong>{column}</strong>.</p>
</div>
{foot}"#,
        head = head("Descarga lista", script),
        total = meta.total,
        in_stock = meta.existence_count,
        href = escape_html(&encode_path_segment(download_name)),
        sheet = escape_html(&meta.sheet_name),
        output = meta.output_count,
        column = escape_html(meta.existence_column_label()),
        foot = FOOT,
    )
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encode a URL path segment (unreserved characters kept).
pub(crate) fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

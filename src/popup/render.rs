//! HTML rendering of the suggestion list

use std::fmt::Write;

use crate::suggest::Layout;

const STYLE: &str = r#"
  :root { color-scheme: dark; }
  body { margin: 0; padding: 14px; font: 13px system-ui, sans-serif;
         background: #1e1f24; color: #e8e8ea; user-select: none; }
  h1 { font-size: 12px; font-weight: 600; letter-spacing: .08em;
       text-transform: uppercase; color: #9a9ca5; margin: 0 0 10px; }
  .cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(130px, 1fr)); gap: 10px; }
  .card { background: #2a2c33; border-radius: 8px; padding: 8px; }
  .preview { position: relative; aspect-ratio: 16 / 10; background: #16171b;
             border-radius: 4px; margin-bottom: 6px; }
  .region { position: absolute; box-sizing: border-box; border: 2px solid #1e1f24;
            background: #5b8def; border-radius: 3px; }
  .name { font-weight: 600; }
  .description { color: #9a9ca5; font-size: 11px; margin-top: 2px; }
  .empty { color: #9a9ca5; }
"#;

const SCRIPT: &str = r#"
  document.addEventListener('keydown', function (e) {
    if (e.key === 'Escape') { window.ipc.postMessage('close'); }
  });
"#;

/// Escape text for use in HTML content and attribute values
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

fn percent(v: f32) -> f32 {
    (v.clamp(0.0, 1.0) * 1000.0).round() / 10.0
}

fn render_card(out: &mut String, layout: &Layout) {
    out.push_str(r#"<div class="card"><div class="preview">"#);
    for region in &layout.regions {
        let _ = write!(
            out,
            r#"<div class="region" style="left:{}%;top:{}%;width:{}%;height:{}%"></div>"#,
            percent(region.x),
            percent(region.y),
            percent(region.width),
            percent(region.height),
        );
    }
    let _ = write!(
        out,
        r#"</div><div class="name">{}</div><div class="description">{}</div></div>"#,
        escape_html(&layout.name),
        escape_html(&layout.description),
    );
}

/// Render a self-contained page listing `layouts`
pub fn render_suggestions(layouts: &[Layout]) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\"><style>");
    out.push_str(STYLE);
    out.push_str("</style></head><body><h1>Layout suggestions</h1>");

    if layouts.is_empty() {
        out.push_str(r#"<p class="empty">No suggestions right now.</p>"#);
    } else {
        out.push_str(r#"<div class="cards">"#);
        for layout in layouts {
            render_card(&mut out, layout);
        }
        out.push_str("</div>");
    }

    out.push_str("<script>");
    out.push_str(SCRIPT);
    out.push_str("</script></body></html>");
    out
}

/// Page shown before the first refresh
pub fn placeholder() -> String {
    render_suggestions(&[])
}

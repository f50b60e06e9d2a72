// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Minimal HTML helpers for the browser-facing pages.

/// Escape text for interpolation into HTML bodies and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap an already-escaped body in a complete document.
pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 36rem; margin: 3rem auto; padding: 0 1rem; color: #1f2328; }}
code {{ background: #f3f4f6; padding: 0 .25rem; border-radius: 3px; }}
.actions {{ display: flex; gap: .75rem; margin-top: 1.5rem; }}
button {{ padding: .5rem 1.25rem; border-radius: 6px; border: 1px solid #d0d7de; cursor: pointer; }}
button.primary {{ background: #1f883d; color: #fff; border-color: #1f883d; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
        body = body
    )
}

/// Render a terminal failure page for a broken authorization flow.
pub fn error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p>Return to your application and start the sign-in again.</p>",
        escape(title),
        escape(message)
    );
    page(title, &body)
}

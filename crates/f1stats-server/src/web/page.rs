//! HTML league table.

use std::fmt::Write;

use f1stats_core::ConstructorRecord;

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>F1 Constructors' Champions</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; }
th, td { padding: 0.3em 0.8em; border-bottom: 1px solid #ddd; text-align: left; }
td.num { text-align: right; }
img.flag { height: 1em; }
.age { color: #666; }
</style>
</head>
<body>
<h1>F1 Constructors' Champions</h1>
"#;

const TAIL: &str = "</body>\n</html>\n";

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the league table. `age` is how long ago the data was refreshed.
pub fn render(records: &[ConstructorRecord], age: Option<&str>) -> String {
    let mut html = String::from(HEAD);

    match age {
        Some(age) => {
            let _ = writeln!(html, "<p class=\"age\">Updated {}</p>", escape_html(age));
        }
        None => html.push_str("<p class=\"age\">No data cached yet</p>\n"),
    }

    if records.is_empty() {
        html.push_str(TAIL);
        return html;
    }

    html.push_str(
        "<table>\n<thead><tr><th></th><th>Constructor</th><th>Titles</th><th>Title years</th>\
         <th>Starts</th><th>Wins</th><th>Win rate</th><th>Active</th></tr></thead>\n<tbody>\n",
    );
    for record in records {
        let flag = if record.country_flag.is_empty() {
            String::new()
        } else {
            format!(
                "<img class=\"flag\" src=\"{}\" alt=\"{}\">",
                escape_html(&record.country_flag),
                escape_html(&record.nationality)
            )
        };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td><a href=\"{}\">{}</a></td><td class=\"num\">{}</td><td>{}</td>\
             <td class=\"num\">{}</td><td class=\"num\">{}</td><td>{}</td><td>{}</td></tr>",
            flag,
            escape_html(&record.url),
            escape_html(&record.name),
            record.title_count,
            escape_html(&record.title_years_display()),
            record.race_starts,
            record.race_wins,
            escape_html(&record.win_rate_display),
            escape_html(&record.active_years_display),
        );
    }
    html.push_str("</tbody>\n</table>\n");
    html.push_str(TAIL);
    html
}

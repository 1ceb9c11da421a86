//! Minimal inline HTML rendering. Templating is deliberately out of scope;
//! these are the thin pages the handlers need and nothing more.

use axum::response::Html;

use crate::records::Student;

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body>{}</body></html>",
        html_escape(title),
        body
    ))
}

pub fn login(user_names: &[String]) -> Html<String> {
    let mut options = String::new();
    for name in user_names {
        let escaped = html_escape(name);
        options.push_str(&format!("<option value=\"{}\">{}</option>", escaped, escaped));
    }
    page(
        "Login",
        &format!(
            "<h1>Attendance Login</h1>\
             <form method=\"post\" action=\"/login\">\
             <select name=\"faculty_name\">{}</select>\
             <button type=\"submit\">Login</button>\
             </form>",
            options
        ),
    )
}

pub fn dashboard(
    user_name: &str,
    is_instructor: bool,
    is_admin: bool,
    groups: &[i64],
    department: Option<&str>,
) -> Html<String> {
    let mut body = format!("<h1>Dashboard</h1><p>Signed in as {}</p><ul>", html_escape(user_name));
    for g in groups {
        body.push_str(&format!(
            "<li><a href=\"/mark_attendance/{}\">Mark group {}</a></li>",
            g, g
        ));
    }
    if let Some(dept) = department {
        body.push_str(&format!(
            "<li><a href=\"/mark_dept_attendance/{}\">Mark department {}</a></li>",
            html_escape(dept),
            html_escape(dept)
        ));
    }
    body.push_str("</ul>");
    if is_instructor {
        body.push_str("<p><a href=\"/export_attendance\">Export report</a></p>");
    }
    if is_admin {
        body.push_str(
            "<h2>Roster admin</h2>\
             <form method=\"post\" action=\"/add_student\">\
             <input name=\"id\" placeholder=\"ID\" required>\
             <input name=\"name\" placeholder=\"Name\" required>\
             <input name=\"department\" placeholder=\"Department\" required>\
             <input name=\"group\" placeholder=\"Group\" required>\
             <button type=\"submit\">Add student</button>\
             </form>\
             <form method=\"post\" action=\"/update_student\">\
             <input name=\"id\" placeholder=\"ID\" required>\
             <input name=\"group\" placeholder=\"Group\">\
             <input name=\"department\" placeholder=\"Department\">\
             <button type=\"submit\">Update student</button>\
             </form>",
        );
    }
    body.push_str("<p><a href=\"/logout\">Logout</a></p>");
    page("Dashboard", &body)
}

pub fn mark_form(cohort_label: &str, action: &str, roster: &[Student]) -> Html<String> {
    let mut rows = String::new();
    for s in roster {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td>\
             <td><input type=\"checkbox\" name=\"status\" value=\"{}\"></td></tr>",
            html_escape(&s.id),
            html_escape(&s.name),
            html_escape(&s.id)
        ));
    }
    page(
        "Mark attendance",
        &format!(
            "<h1>Mark attendance: {}</h1>\
             <form method=\"post\" action=\"{}\">\
             <label>Date <input type=\"date\" name=\"attendance_date\" required></label>\
             <label>Session <input type=\"text\" name=\"session\" required></label>\
             <table><tr><th>ID</th><th>Name</th><th>Present</th></tr>{}</table>\
             <button type=\"submit\">Submit</button>\
             </form>",
            html_escape(cohort_label),
            html_escape(action),
            rows
        ),
    )
}

pub fn status(success: bool, message: &str) -> Html<String> {
    let heading = if success { "Saved" } else { "Failed" };
    page(
        heading,
        &format!(
            "<h1>{}</h1><p>{}</p><p><a href=\"/dashboard\">Back to dashboard</a></p>",
            heading,
            html_escape(message)
        ),
    )
}

//! HTML rendering and the client-side view model of the todo list
//!
//! [`TodoListView`] holds the rows the browser shows and the transitions it
//! goes through (`Loading` until the first fetch, then `Ready`). The page
//! served at `/` is rendered from it, and `static/app.js` mirrors the same
//! transitions and markup in the browser.

use chrono::{DateTime, Utc};

use crate::preview::{PdfSource, Preview, UnsupportedReason};
use crate::resources::FileResource;
use crate::todo::{Todo, TodoPatch, normalize_title};

/// Escape text for use in HTML content and attribute values
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

/// Format a timestamp to the minute, as shown on todo rows
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// A todo as shown in the list, with its UI-only deadline
#[derive(Clone, Debug, PartialEq)]
pub struct TodoRow {
    pub todo: Todo,
    pub deadline: Option<DateTime<Utc>>,
}

/// State of the todo list in the browser
#[derive(Clone, Debug, PartialEq)]
pub enum TodoListView {
    Loading,
    Ready(Vec<TodoRow>),
}

impl Default for TodoListView {
    fn default() -> Self {
        TodoListView::Loading
    }
}

impl TodoListView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the loading state with the fetched list, in server order
    pub fn finish_loading(&mut self, todos: Vec<Todo>) {
        let rows = todos
            .into_iter()
            .map(|todo| TodoRow {
                todo,
                deadline: None,
            })
            .collect();
        *self = TodoListView::Ready(rows);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, TodoListView::Loading)
    }

    /// Rows currently shown; empty while loading
    pub fn rows(&self) -> &[TodoRow] {
        match self {
            TodoListView::Loading => &[],
            TodoListView::Ready(rows) => rows,
        }
    }

    /// Check the add-form input before it is submitted
    ///
    /// Returns the trimmed title, or `None` when nothing should be sent.
    pub fn validate_title(input: &str) -> Option<String> {
        normalize_title(input)
    }

    /// Show a newly created todo at the top of the list
    ///
    /// Returns false while the list is still loading.
    pub fn apply_created(&mut self, todo: Todo, deadline: Option<DateTime<Utc>>) -> bool {
        match self {
            TodoListView::Loading => false,
            TodoListView::Ready(rows) => {
                rows.insert(0, TodoRow { todo, deadline });
                true
            }
        }
    }

    /// Replace a row with the server's updated record, keeping its deadline
    pub fn apply_updated(&mut self, todo: Todo) -> bool {
        match self.row_mut(todo.id) {
            Some(row) => {
                row.todo = todo;
                true
            }
            None => false,
        }
    }

    /// Remove a row once the server confirmed the delete
    pub fn apply_deleted(&mut self, id: u64) -> bool {
        match self {
            TodoListView::Loading => false,
            TodoListView::Ready(rows) => {
                let before = rows.len();
                rows.retain(|row| row.todo.id != id);
                rows.len() < before
            }
        }
    }

    /// Patch that flips the completion flag of a row
    pub fn toggle_request(&self, id: u64) -> Option<TodoPatch> {
        self.rows()
            .iter()
            .find(|row| row.todo.id == id)
            .map(|row| TodoPatch {
                title: None,
                completed: Some(!row.todo.completed),
            })
    }

    fn row_mut(&mut self, id: u64) -> Option<&mut TodoRow> {
        match self {
            TodoListView::Loading => None,
            TodoListView::Ready(rows) => rows.iter_mut().find(|row| row.todo.id == id),
        }
    }

    /// Render the list area: loading indicator, placeholder or rows
    pub fn render(&self) -> String {
        match self {
            TodoListView::Loading => {
                r#"<div class="loading"><div class="spinner"></div><p>Loading todos...</p></div>"#
                    .to_string()
            }
            TodoListView::Ready(rows) if rows.is_empty() => {
                r#"<div class="placeholder"><p>No todos yet. Add one above!</p></div>"#.to_string()
            }
            TodoListView::Ready(rows) => {
                let items: String = rows.iter().map(render_item).collect();
                format!(r#"<div class="todo-list">{}</div>"#, items)
            }
        }
    }
}

/// Render one todo row
///
/// Completed todos get the `completed` class, which the stylesheet draws with
/// a strikethrough.
pub fn render_item(row: &TodoRow) -> String {
    let todo = &row.todo;
    let (checked, title_class) = if todo.completed {
        (" checked", "title completed")
    } else {
        ("", "title")
    };
    let deadline = row
        .deadline
        .map(|at| {
            format!(
                r#"<span class="deadline">Deadline: {}</span>"#,
                format_timestamp(&at)
            )
        })
        .unwrap_or_default();

    format!(
        concat!(
            r#"<div class="todo-item" data-id="{id}">"#,
            r#"<input type="checkbox" class="toggle"{checked}>"#,
            r#"<div class="body"><span class="{title_class}">{title}</span>"#,
            r#"<div class="meta"><span>Created: {created}</span>{deadline}</div></div>"#,
            r#"<button class="delete">Delete</button>"#,
            r#"</div>"#
        ),
        id = todo.id,
        checked = checked,
        title_class = title_class,
        title = escape_html(&todo.title),
        created = format_timestamp(&todo.created_at),
        deadline = deadline,
    )
}

const PAGE_TEMPLATE: &str = include_str!("./static/index.html");

/// Render the application page
///
/// The list area is rendered server-side and the same todos are injected as a
/// `TODOS_DATA` script constant for the browser script to start from.
///
/// # Arguments
/// * `view` - State of the list to render
///
/// # Returns
/// * `String` - The complete HTML page
pub fn render_page(view: &TodoListView) -> String {
    let todos: Vec<&Todo> = view.rows().iter().map(|row| &row.todo).collect();
    // "</" cannot appear inside an inline script
    let todos_json = serde_json::to_string(&todos)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");

    PAGE_TEMPLATE.replace("{{TODO_LIST}}", &view.render()).replace(
        "</head>",
        &format!(
            "    <script>const TODOS_DATA = {};</script>\n</head>",
            todos_json
        ),
    )
}

fn download_actions(resource: &FileResource, open_in_tab: bool) -> String {
    let mut actions = format!(
        r#"<a class="button primary" href="/resources/{}/download" download="{}">Download file</a>"#,
        resource.id,
        escape_html(&resource.name)
    );
    if open_in_tab {
        actions.push_str(&format!(
            r#"<a class="button" href="/resources/{}/raw" target="_blank" rel="noopener noreferrer">Open in new tab</a>"#,
            resource.id
        ));
    }
    format!(r#"<div class="actions">{}</div>"#, actions)
}

/// Render the body of the preview panel
///
/// # Arguments
/// * `resource` - The previewed file
/// * `preview` - Result of [`crate::preview::render`]
/// * `pdf_url` - URL the PDF viewer should load, for PDF previews
///
/// # Returns
/// * `String` - HTML fragment for the panel
pub fn render_preview(resource: &FileResource, preview: &Preview, pdf_url: Option<&str>) -> String {
    let name = escape_html(&resource.name);
    match preview {
        Preview::Image { src } => format!(
            r#"<div class="preview-image"><img src="{}" alt="{}"></div>"#,
            escape_html(src),
            name
        ),
        Preview::Pdf(source) => {
            let url = match (pdf_url, source) {
                (Some(url), _) => url.to_string(),
                (None, PdfSource::Url(url)) => url.clone(),
                (None, PdfSource::Bytes(_)) => String::new(),
            };
            format!(
                r#"<div class="preview-pdf"><iframe src="{}" title="{}"></iframe></div>"#,
                escape_html(&url),
                name
            )
        }
        Preview::Document { html } => {
            // Converter output is built from escaped text and a fixed tag set
            format!(r#"<div class="preview-document">{}</div>"#, html)
        }
        Preview::Sheet { rows } => render_sheet(rows),
        Preview::Unsupported(reason) => {
            let (icon, message) = match reason {
                UnsupportedReason::LegacyWord => {
                    ("📝", "Legacy Word format (.doc) cannot be previewed".to_string())
                }
                UnsupportedReason::LegacyExcel => {
                    ("📊", "Legacy Excel format (.xls) cannot be previewed".to_string())
                }
                UnsupportedReason::Unknown if resource.mime.is_empty() => {
                    ("📎", "Unknown file type".to_string())
                }
                UnsupportedReason::Unknown => ("📎", resource.mime.clone()),
            };
            format!(
                concat!(
                    r#"<div class="preview-unsupported"><div class="icon">{}</div>"#,
                    r#"<h4>{}</h4><p>{}</p><p class="uploaded">Uploaded: {}</p>{}</div>"#
                ),
                icon,
                name,
                escape_html(&message),
                format_timestamp(&resource.uploaded_at),
                download_actions(resource, true)
            )
        }
        Preview::Failed { message } => format!(
            r#"<div class="preview-error"><div class="icon">⚠️</div><p class="error">{}</p>{}</div>"#,
            escape_html(message),
            download_actions(resource, false)
        ),
    }
}

/// Render a cell grid as a table whose first row is styled as a header
pub fn render_sheet(rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return r#"<div class="preview-sheet"><p class="placeholder">This sheet is empty.</p></div>"#
            .to_string();
    }

    let mut html = String::from(r#"<div class="preview-sheet"><table><tbody>"#);
    for (index, row) in rows.iter().enumerate() {
        if index == 0 {
            html.push_str(r#"<tr class="header">"#);
        } else {
            html.push_str("<tr>");
        }
        for cell in row {
            html.push_str("<td>");
            html.push_str(&escape_html(cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");
    html
}

//! Page and browser interaction
//!
//! The executor drives a `BrowserSession` obtained from a `BrowserDriver`. The
//! session is launched on the first `browser_action` call, reused by every
//! later call, and closed by `cleanup()`. A launch failure is reported on the
//! call that needed the session and the next call tries again.
//!
//! `HttpBrowserDriver` is a lightweight driver that fetches pages with reqwest
//! and inspects them with scraper. `type` fills a named form field and
//! `click` either follows a link or submits the enclosing form of a submit
//! control with the typed values. It cannot render, so `screenshot` fails.

use async_trait::async_trait;
use schemars::JsonSchema;
use scraper::{ ElementRef, Html, Selector };
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{ debug, info };
use url::Url;

use super::{ LazyResource, ToolExecutor, parse_arguments };
use crate::errors::Error;
use crate::types::{ CallToolResult, Content, Tool };

/// Characters returned per `scroll`
const SCROLL_WINDOW: usize = 2000;

/// Characters returned by `extract` before truncation
const MAX_EXTRACT: usize = 30_000;

const USER_AGENT: &str = concat!("cop-rs/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BrowserAction {
    Navigate,
    Screenshot,
    Click,
    Type,
    Scroll,
    Extract,
}

/// Parameters of `browser_action`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BrowserActionParams {
    /// What to do
    pub action: BrowserAction,
    /// Page to open (navigate)
    pub url: Option<String>,
    /// CSS selector of the target element (click, type, extract)
    pub selector: Option<String>,
    /// Text to enter (type)
    pub text: Option<String>,
}

/// Launches browser sessions
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, Error>;
}

/// A live browser session
#[async_trait]
pub trait BrowserSession: Send {
    /// Open `url`; returns a one-line summary of the loaded page
    async fn navigate(&mut self, url: &str) -> Result<String, Error>;
    /// PNG image of the current page
    async fn screenshot(&mut self) -> Result<Vec<u8>, Error>;
    async fn click(&mut self, selector: &str) -> Result<String, Error>;
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<String, Error>;
    /// Next window of the page's text
    async fn scroll(&mut self) -> Result<String, Error>;
    /// Text of the matching elements, or of the whole page
    async fn extract(&mut self, selector: Option<&str>) -> Result<String, Error>;
    async fn close(&mut self) -> Result<(), Error>;
}

pub struct BrowserExecutor {
    driver: Arc<dyn BrowserDriver>,
    session: LazyResource<Box<dyn BrowserSession>>,
}

impl BrowserExecutor {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            session: LazyResource::new(),
        }
    }

    pub async fn has_session(&self) -> bool {
        self.session.is_initialized().await
    }

    async fn browser_action(&self, params: BrowserActionParams) -> Result<CallToolResult, Error> {
        let mut session = self.session.acquire(|| async {
            info!("Launching browser session");
            self.driver.launch().await
        }).await?;

        debug!("Browser action {:?}", params.action);
        let text = match params.action {
            BrowserAction::Navigate => {
                let url = required(params.url.as_deref(), "url", "navigate")?;
                session.navigate(url).await?
            }
            BrowserAction::Screenshot => {
                let png = session.screenshot().await?;
                return Ok(CallToolResult::success(vec![Content::image(&png, "image/png")]));
            }
            BrowserAction::Click => {
                let selector = required(params.selector.as_deref(), "selector", "click")?;
                session.click(selector).await?
            }
            BrowserAction::Type => {
                let selector = required(params.selector.as_deref(), "selector", "type")?;
                let text = required(params.text.as_deref(), "text", "type")?;
                session.type_text(selector, text).await?
            }
            BrowserAction::Scroll => session.scroll().await?,
            BrowserAction::Extract => session.extract(params.selector.as_deref()).await?,
        };

        Ok(CallToolResult::text(text))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str, action: &str) -> Result<&'a str, Error> {
    value.ok_or_else(|| Error::InvalidParams(format!("'{}' is required for {}", field, action)))
}

#[async_trait]
impl ToolExecutor for BrowserExecutor {
    fn family(&self) -> &str {
        "browser"
    }

    fn operations(&self) -> Vec<Tool> {
        vec![
            Tool::for_params::<BrowserActionParams>(
                "browser_action",
                "Interact with a web page: navigate, screenshot, click, type, scroll or extract"
            )
        ]
    }

    async fn execute(&self, operation: &str, arguments: Value) -> Result<CallToolResult, Error> {
        match operation {
            "browser_action" => self.browser_action(parse_arguments(operation, arguments)?).await,
            other => Err(Error::Execution(format!("browser executor has no operation '{}'", other))),
        }
    }

    async fn cleanup(&self) -> Result<(), Error> {
        if let Some(mut session) = self.session.take().await {
            info!("Closing browser session");
            session.close().await?;
        }
        Ok(())
    }
}

/// Driver backed by plain HTTP fetches
pub struct HttpBrowserDriver {
    timeout: Duration,
}

impl HttpBrowserDriver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowserDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, Error> {
        let client = reqwest::Client
            ::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Execution(format!("Failed to start browser client: {}", e)))?;

        Ok(
            Box::new(HttpBrowserSession {
                client,
                page: None,
                form: HashMap::new(),
                scroll_offset: 0,
            })
        )
    }
}

struct Page {
    url: Url,
    html: String,
}

struct HttpBrowserSession {
    client: reqwest::Client,
    page: Option<Page>,
    /// Typed values by field name, for the current page only
    form: HashMap<String, String>,
    scroll_offset: usize,
}

impl HttpBrowserSession {
    fn page(&self) -> Result<&Page, Error> {
        self.page.as_ref().ok_or_else(|| Error::Execution("No page loaded; navigate first".to_string()))
    }

    async fn load(&mut self, url: Url) -> Result<String, Error> {
        let request = self.client.get(url.clone());
        self.fetch(request, &url).await
    }

    async fn submit(&mut self, submission: FormSubmission) -> Result<String, Error> {
        let page = self.page()?;
        let mut action = page.url
            .join(&submission.action)
            .map_err(|e| Error::Execution(format!("Bad form action '{}': {}", submission.action, e)))?;

        let mut fields = submission.fields;
        for (name, value) in fields.iter_mut() {
            if let Some(typed) = self.form.get(name.as_str()) {
                *value = typed.clone();
            }
        }
        for (name, typed) in &self.form {
            if !fields.iter().any(|(field, _)| field == name) {
                fields.push((name.clone(), typed.clone()));
            }
        }

        debug!("Submitting form to {} ({} fields)", action, fields.len());
        let request = if submission.post {
            self.client.post(action.clone()).form(&fields)
        } else {
            action.query_pairs_mut().clear().extend_pairs(&fields);
            self.client.get(action.clone())
        };
        self.fetch(request, &action).await
    }

    async fn fetch(&mut self, request: reqwest::RequestBuilder, url: &Url) -> Result<String, Error> {
        let response = request
            .send().await
            .map_err(|e| Error::Execution(format!("Failed to load {}: {}", url, e)))?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let html = response
            .text().await
            .map_err(|e| Error::Execution(format!("Failed to read {}: {}", url, e)))?;

        let title = page_title(&html);
        self.page = Some(Page { url: final_url.clone(), html });
        self.form.clear();
        self.scroll_offset = 0;

        Ok(format!("Loaded {} (HTTP {}): {}", final_url, status, title))
    }
}

#[async_trait]
impl BrowserSession for HttpBrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<String, Error> {
        let url = Url::parse(url).map_err(|e|
            Error::InvalidParams(format!("invalid url '{}': {}", url, e))
        )?;
        self.load(url).await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, Error> {
        Err(Error::Execution("The HTTP browser driver cannot render pages; screenshot is unavailable".to_string()))
    }

    async fn click(&mut self, selector: &str) -> Result<String, Error> {
        let page = self.page()?;
        if let Some(submission) = form_submission(&page.html, selector)? {
            return self.submit(submission).await;
        }
        let href = link_target(&page.html, selector)?;
        let target = page.url
            .join(&href)
            .map_err(|e| Error::Execution(format!("Bad link '{}': {}", href, e)))?;
        self.load(target).await
    }

    /// Set the value of the named form field matched by `selector`; it is sent
    /// when a submit control of its form is clicked
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<String, Error> {
        let name = field_name(&self.page()?.html, selector)?;
        self.form.insert(name, text.to_string());
        Ok(format!("Typed {} characters into {}", text.chars().count(), selector))
    }

    async fn scroll(&mut self) -> Result<String, Error> {
        let text = readable_text(&self.page()?.html);
        let chars: Vec<char> = text.chars().collect();
        if self.scroll_offset >= chars.len() {
            return Ok("Reached the end of the page".to_string());
        }
        let end = (self.scroll_offset + SCROLL_WINDOW).min(chars.len());
        let window: String = chars[self.scroll_offset..end].iter().collect();
        self.scroll_offset = end;
        Ok(window)
    }

    async fn extract(&mut self, selector: Option<&str>) -> Result<String, Error> {
        let page = self.page()?;
        let text = match selector {
            Some(selector) => selected_text(&page.html, selector)?,
            None => readable_text(&page.html),
        };
        if text.len() > MAX_EXTRACT {
            let cut = text
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|i| *i <= MAX_EXTRACT)
                .last()
                .unwrap_or(0);
            return Ok(format!("{}...\n[truncated, {} total bytes]", &text[..cut], text.len()));
        }
        Ok(text)
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.page = None;
        self.form.clear();
        self.scroll_offset = 0;
        Ok(())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, Error> {
    Selector::parse(selector).map_err(|e|
        Error::InvalidParams(format!("Invalid CSS selector '{}': {}", selector, e))
    )
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let mut text = String::new();
    for word in parts.flat_map(str::split_whitespace) {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(word);
    }
    text
}

fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next().map(|el| collapse_whitespace(el.text())))
        .unwrap_or_default()
}

fn readable_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(body) = Selector::parse("body") else {
        return String::new();
    };
    document
        .select(&body)
        .next()
        .map(|el| collapse_whitespace(el.text()))
        .unwrap_or_default()
}

fn selected_text(html: &str, selector: &str) -> Result<String, Error> {
    let selector_parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let parts: Vec<String> = document
        .select(&selector_parsed)
        .map(|el| collapse_whitespace(el.text()))
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(Error::Execution(format!("No element matches '{}'", selector)));
    }
    Ok(parts.join("\n\n"))
}

/// A form submission triggered by clicking a submit control
#[derive(Debug, PartialEq)]
struct FormSubmission {
    action: String,
    post: bool,
    fields: Vec<(String, String)>,
}

fn is_submit_control(element: &ElementRef) -> bool {
    let el = element.value();
    let kind = el.attr("type").map(str::to_ascii_lowercase);
    match el.name() {
        "button" => matches!(kind.as_deref(), None | Some("submit")),
        "input" => matches!(kind.as_deref(), Some("submit") | Some("image")),
        _ => false,
    }
}

/// Name of the form field matched by `selector`
fn field_name(html: &str, selector: &str) -> Result<String, Error> {
    let selector_parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let element = document
        .select(&selector_parsed)
        .next()
        .ok_or_else(|| Error::Execution(format!("No element matches '{}'", selector)))?;
    if !matches!(element.value().name(), "input" | "textarea" | "select") {
        return Err(Error::Execution(format!("Element '{}' is not a form field", selector)));
    }
    element
        .value()
        .attr("name")
        .map(str::to_string)
        .ok_or_else(|| Error::Execution(format!("Form field '{}' has no name", selector)))
}

/// The submission a click on `selector` would make, if it is a submit
/// control inside a form
fn form_submission(html: &str, selector: &str) -> Result<Option<FormSubmission>, Error> {
    let selector_parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let Some(control) = document.select(&selector_parsed).next() else {
        return Err(Error::Execution(format!("No element matches '{}'", selector)));
    };
    if !is_submit_control(&control) {
        return Ok(None);
    }
    let Some(form) = control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "form") else {
        return Ok(None);
    };
    let Ok(field_selector) = Selector::parse("input[name], textarea[name], select[name]") else {
        return Ok(None);
    };

    let mut fields = Vec::new();
    for field in form.select(&field_selector) {
        let el = field.value();
        let Some(name) = el.attr("name") else {
            continue;
        };
        let value = match el.name() {
            "textarea" => field.text().collect::<String>(),
            "select" => {
                let options: Vec<ElementRef> = field
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .filter(|o| o.value().name() == "option")
                    .collect();
                let chosen = options
                    .iter()
                    .find(|o| o.value().attr("selected").is_some())
                    .or(options.first());
                match chosen {
                    Some(option) =>
                        option.value()
                            .attr("value")
                            .map(str::to_string)
                            .unwrap_or_else(|| collapse_whitespace(option.text())),
                    None => continue,
                }
            }
            _ => {
                let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "image" | "button" | "reset" | "file" => {
                        if field.id() != control.id() {
                            continue;
                        }
                    }
                    "checkbox" | "radio" if el.attr("checked").is_none() => {
                        continue;
                    }
                    _ => {}
                }
                el.attr("value").unwrap_or_default().to_string()
            }
        };
        fields.push((name.to_string(), value));
    }
    // a named <button> contributes its own value
    if control.value().name() == "button" {
        if let Some(name) = control.value().attr("name") {
            let value = control.value().attr("value").unwrap_or_default();
            fields.push((name.to_string(), value.to_string()));
        }
    }

    Ok(
        Some(FormSubmission {
            action: form.value().attr("action").unwrap_or_default().to_string(),
            post: form.value()
                .attr("method")
                .is_some_and(|method| method.eq_ignore_ascii_case("post")),
            fields,
        })
    )
}

fn link_target(html: &str, selector: &str) -> Result<String, Error> {
    let selector_parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let element = document
        .select(&selector_parsed)
        .next()
        .ok_or_else(|| Error::Execution(format!("No element matches '{}'", selector)))?;
    element
        .value()
        .attr("href")
        .map(str::to_string)
        .ok_or_else(|| Error::Execution(format!("Element '{}' has no link to follow", selector)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };

    const PAGE: &str =
        r#"<html><head><title> Docs </title></head>
        <body><h1>Welcome</h1><p class="intro">Read the   guide.</p>
        <a id="next" href="/next">Next</a><input name="q"></body></html>"#;

    #[derive(Default)]
    struct FakeDriver {
        launches: AtomicUsize,
        fail: AtomicBool,
        log: Arc<Mutex<Vec<String>>>,
    }

    struct FakeSession {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>, Error> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Execution("browser failed to start".to_string()));
            }
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession { log: self.log.clone() }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn navigate(&mut self, url: &str) -> Result<String, Error> {
            self.log.lock().unwrap().push(format!("navigate {}", url));
            Ok(format!("at {}", url))
        }
        async fn screenshot(&mut self) -> Result<Vec<u8>, Error> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
        async fn click(&mut self, selector: &str) -> Result<String, Error> {
            Ok(format!("clicked {}", selector))
        }
        async fn type_text(&mut self, selector: &str, text: &str) -> Result<String, Error> {
            Ok(format!("typed {} into {}", text, selector))
        }
        async fn scroll(&mut self) -> Result<String, Error> {
            Ok("scrolled".to_string())
        }
        async fn extract(&mut self, _selector: Option<&str>) -> Result<String, Error> {
            Ok("text".to_string())
        }
        async fn close(&mut self) -> Result<(), Error> {
            self.log.lock().unwrap().push("close".to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn session_is_launched_lazily_and_reused() {
        let driver = Arc::new(FakeDriver::default());
        let executor = BrowserExecutor::new(driver.clone());
        assert!(!executor.has_session().await);

        executor
            .execute("browser_action", json!({ "action": "navigate", "url": "https://a.test" })).await
            .unwrap();
        let result = executor
            .execute("browser_action", json!({ "action": "click", "selector": "#go" })).await
            .unwrap();
        assert_eq!(result.first_text(), Some("clicked #go"));
        assert_eq!(driver.launches.load(Ordering::SeqCst), 1);

        executor.cleanup().await.unwrap();
        executor.cleanup().await.unwrap();
        assert!(!executor.has_session().await);
        assert_eq!(*driver.log.lock().unwrap(), vec!["navigate https://a.test", "close"]);
    }

    #[tokio::test]
    async fn launch_failure_is_reported_and_retried() {
        let driver = Arc::new(FakeDriver::default());
        driver.fail.store(true, Ordering::SeqCst);
        let executor = BrowserExecutor::new(driver.clone());

        let err = executor
            .execute("browser_action", json!({ "action": "scroll" })).await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
        assert!(!executor.has_session().await);

        driver.fail.store(false, Ordering::SeqCst);
        let ok = executor.execute("browser_action", json!({ "action": "scroll" })).await.unwrap();
        assert_eq!(ok.first_text(), Some("scrolled"));
    }

    #[tokio::test]
    async fn screenshot_is_an_image_block() {
        let executor = BrowserExecutor::new(Arc::new(FakeDriver::default()));
        let result = executor
            .execute("browser_action", json!({ "action": "screenshot" })).await
            .unwrap();
        assert!(matches!(&result.content[0], Content::Image { mime_type, .. } if mime_type == "image/png"));
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let executor = BrowserExecutor::new(Arc::new(FakeDriver::default()));
        let err = executor
            .execute("browser_action", json!({ "action": "type", "selector": "input" })).await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams(ref m) if m.contains("'text'")));
    }

    #[test]
    fn html_helpers() {
        assert_eq!(page_title(PAGE), "Docs");
        assert_eq!(selected_text(PAGE, "p.intro").unwrap(), "Read the guide.");
        assert_eq!(link_target(PAGE, "#next").unwrap(), "/next");
        assert_eq!(field_name(PAGE, "input").unwrap(), "q");
        assert!(field_name(PAGE, "h1").is_err());
        assert_eq!(form_submission(PAGE, "#next").unwrap(), None);
        assert!(readable_text(PAGE).starts_with("Welcome Read the guide."));
        assert!(link_target(PAGE, "h1").is_err());
        assert!(matches!(parse_selector("[[["), Err(Error::InvalidParams(_))));
    }

    #[tokio::test]
    async fn http_session_follows_links() {
        use axum::{ Router, response::Html as HtmlBody, routing::get };

        let app = Router::new()
            .route("/", get(|| async { HtmlBody(PAGE) }))
            .route(
                "/next",
                get(|| async {
                    HtmlBody("<html><head><title>Second</title></head><body>Page two</body></html>")
                })
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut session = HttpBrowserDriver::new(Duration::from_secs(5)).launch().await.unwrap();
        assert!(session.extract(None).await.is_err());

        let loaded = session.navigate(&format!("http://{}/", addr)).await.unwrap();
        assert!(loaded.contains("HTTP 200"));
        assert!(loaded.ends_with("Docs"));

        let typed = session.type_text("input[name=q]", "rust").await.unwrap();
        assert_eq!(typed, "Typed 4 characters into input[name=q]");

        let clicked = session.click("#next").await.unwrap();
        assert!(clicked.ends_with("Second"));
        assert_eq!(session.extract(None).await.unwrap(), "Page two");
        assert_eq!(session.scroll().await.unwrap(), "Page two");
        assert_eq!(session.scroll().await.unwrap(), "Reached the end of the page");
        assert!(session.screenshot().await.is_err());
    }

    const FORMS: &str =
        r#"<html><body>
        <form action="/search" method="get">
          <input name="q" value="old"><input type="hidden" name="lang" value="en">
          <input type="checkbox" name="exact"><button type="submit">Go</button>
        </form>
        <form action="/login" method="post">
          <input name="user"><textarea name="note">hi</textarea>
          <select name="role"><option value="dev">Dev</option><option value="ops" selected>Ops</option></select>
          <input type="submit" name="go" value="Sign in">
        </form></body></html>"#;

    #[test]
    fn submit_controls_collect_their_form() {
        let search = form_submission(FORMS, "button").unwrap().unwrap();
        assert_eq!(search.action, "/search");
        assert!(!search.post);
        assert_eq!(
            search.fields,
            vec![("q".to_string(), "old".to_string()), ("lang".to_string(), "en".to_string())]
        );

        let login = form_submission(FORMS, "input[type=submit]").unwrap().unwrap();
        assert!(login.post);
        assert_eq!(
            login.fields,
            vec![
                ("user".to_string(), String::new()),
                ("note".to_string(), "hi".to_string()),
                ("role".to_string(), "ops".to_string()),
                ("go".to_string(), "Sign in".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn http_session_submits_typed_values() {
        use axum::{ Form, Router, extract::Query, response::Html as HtmlBody, routing::{ get, post } };

        fn titled(title: String) -> HtmlBody<String> {
            HtmlBody(format!("<html><head><title>{}</title></head><body></body></html>", title))
        }

        let app = Router::new()
            .route("/form", get(|| async { HtmlBody(FORMS) }))
            .route(
                "/search",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    titled(format!("q={} lang={}", q["q"], q["lang"]))
                })
            )
            .route(
                "/login",
                post(|Form(f): Form<HashMap<String, String>>| async move {
                    titled(format!("user={} role={} go={}", f["user"], f["role"], f["go"]))
                })
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut session = HttpBrowserDriver::new(Duration::from_secs(5)).launch().await.unwrap();
        let page = format!("http://{}/form", addr);

        session.navigate(&page).await.unwrap();
        session.type_text("input[name=q]", "rust async").await.unwrap();
        let searched = session.click("button").await.unwrap();
        assert!(searched.ends_with("q=rust async lang=en"), "{}", searched);

        session.navigate(&page).await.unwrap();
        session.type_text("input[name=user]", "ada").await.unwrap();
        let logged_in = session.click("input[type=submit]").await.unwrap();
        assert!(logged_in.ends_with("user=ada role=ops go=Sign in"), "{}", logged_in);

        session.navigate(&page).await.unwrap();
        assert!(session.type_text("form", "x").await.is_err());
    }
}

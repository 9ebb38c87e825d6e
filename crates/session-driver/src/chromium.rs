//! Chromium backend over CDP

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wizard_core_types::InteractionKind;

use crate::errors::DriverError;
use crate::ports::{BrowsingSession, SessionDriver};
use crate::types::{ElementHandle, PageInfo, SessionConfig};

const TEXT_PREFIX: &str = "text=";
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const TYPEAHEAD_SETTLE: Duration = Duration::from_millis(300);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const IS_DISABLED_FN: &str = r#"function() {
    return this.disabled === true || this.getAttribute('aria-disabled') === 'true';
}"#;

const CLEAR_FN: &str = r#"function() {
    if ('value' in this) {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
    }
}"#;

const SCRIPT_CLICK_FN: &str = r#"function() { this.click(); }"#;

/// Matches by option value first, then by visible label; each attempt also
/// tries the typographic apostrophe (U+2019) some sites use in option text.
const SELECT_FN: &str = r#"function() {
    if (!this || this.tagName !== 'SELECT') { return 'not-select'; }
    const wanted = __WANTED__;
    const candidates = [wanted, wanted.replace(/'/g, '’')];
    const options = Array.from(this.options);
    let match = null;
    for (const c of candidates) {
        match = options.find(o => o.value === c);
        if (match) { break; }
    }
    if (!match) {
        for (const c of candidates) {
            match = options.find(o => (o.label || o.text || '').trim() === c);
            if (match) { break; }
        }
    }
    if (!match) { return 'no-option'; }
    this.value = match.value;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return 'ok';
}"#;

/// Launches a dedicated Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumDriver;

impl ChromiumDriver {
    pub fn new() -> Self {
        Self
    }

    fn browser_config(config: &SessionConfig) -> Result<BrowserConfig, DriverError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(REQUEST_TIMEOUT)
            .window_size(config.viewport.width, config.viewport.height)
            .viewport(CdpViewport {
                width: config.viewport.width,
                height: config.viewport.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &config.chrome_path {
            if !path.exists() {
                return Err(DriverError::SessionAcquisition(format!(
                    "chrome executable not found at {}",
                    path.display()
                )));
            }
            builder = builder.chrome_executable(path.clone());
        }

        let mut args = vec![
            "--disable-background-networking".to_string(),
            "--disable-default-apps".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            "--disable-popup-blocking".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
        ];
        if let Some(agent) = config.engine_profile.user_agent() {
            args.push(format!("--user-agent={agent}"));
        }
        args.extend(config.launch_args.iter().cloned());
        builder = builder.args(args);

        builder
            .build()
            .map_err(|err| DriverError::SessionAcquisition(format!("browser config error: {err}")))
    }
}

#[async_trait]
impl SessionDriver for ChromiumDriver {
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn BrowsingSession>, DriverError> {
        let browser_config = Self::browser_config(config)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|err| DriverError::SessionAcquisition(format!("failed to launch chromium: {err}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("chromium handler stopped: {err}");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(DriverError::SessionAcquisition(format!(
                    "failed to create page: {err}"
                )));
            }
        };

        info!(
            headless = config.headless,
            engine_profile = config.engine_profile.as_str(),
            "chromium session opened"
        );

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            elements: HashMap::new(),
            next_id: 0,
            element_wait: config.element_wait,
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    elements: HashMap<u64, Element>,
    next_id: u64,
    element_wait: Duration,
    jpeg_quality: u8,
}

impl ChromiumSession {
    async fn find_once(&self, selector: &str) -> Option<Element> {
        match selector.strip_prefix(TEXT_PREFIX) {
            Some(text) => self.page.find_xpath(text_xpath(text)).await.ok(),
            None => self.page.find_element(selector).await.ok(),
        }
    }

    async fn find_with_wait(&self, selector: &str) -> Result<Element, DriverError> {
        let deadline = Instant::now() + self.element_wait;
        loop {
            if let Some(element) = self.find_once(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(DriverError::not_found(selector));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn element(&self, handle: &ElementHandle) -> Result<&Element, DriverError> {
        self.elements
            .get(&handle.id)
            .ok_or_else(|| DriverError::not_found(handle.selector.clone()))
    }

    async fn call(element: &Element, function: &str) -> Result<Option<Value>, DriverError> {
        let returns = element.call_js_fn(function, false).await?;
        Ok(returns.result.value)
    }

    async fn ensure_enabled(
        element: &Element,
        selector: &str,
        kind: InteractionKind,
    ) -> Result<(), DriverError> {
        let disabled = Self::call(element, IS_DISABLED_FN)
            .await?
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        if disabled {
            return Err(DriverError::rejected(selector, kind, "element is disabled"));
        }
        Ok(())
    }

    async fn fill(element: &Element, text: &str) -> Result<(), DriverError> {
        Self::call(element, CLEAR_FN).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }
}

#[async_trait]
impl BrowsingSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        debug!(url = %url, "navigating");
        self.elements.clear();
        self.page
            .goto(url)
            .await
            .map_err(|err| DriverError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(())
    }

    async fn locate(&mut self, selector: &str) -> Result<ElementHandle, DriverError> {
        let element = self.find_with_wait(selector).await?;
        self.next_id += 1;
        let handle = ElementHandle {
            id: self.next_id,
            selector: selector.to_string(),
        };
        self.elements.insert(handle.id, element);
        Ok(handle)
    }

    async fn interact(
        &mut self,
        handle: &ElementHandle,
        kind: InteractionKind,
        value: Option<&str>,
    ) -> Result<(), DriverError> {
        let selector = handle.selector.as_str();
        let element = self.element(handle)?;
        let needs_value = || {
            value.ok_or_else(|| DriverError::rejected(selector, kind, "interaction requires a value"))
        };

        match kind {
            InteractionKind::Click => {
                Self::ensure_enabled(element, selector, kind).await?;
                element.click().await?;
            }
            InteractionKind::ScriptClick => {
                Self::call(element, SCRIPT_CLICK_FN).await?;
            }
            InteractionKind::Fill => {
                let text = needs_value()?;
                Self::ensure_enabled(element, selector, kind).await?;
                Self::fill(element, text).await?;
            }
            InteractionKind::FillThenSubmit => {
                let text = needs_value()?;
                Self::ensure_enabled(element, selector, kind).await?;
                Self::fill(element, text).await?;
                tokio::time::sleep(TYPEAHEAD_SETTLE).await;
                element.press_key("Enter").await?;
            }
            InteractionKind::Select => {
                let wanted = needs_value()?;
                Self::ensure_enabled(element, selector, kind).await?;
                let outcome = Self::call(element, &select_script(wanted)?).await?;
                match outcome.as_ref().and_then(Value::as_str) {
                    Some("ok") => {}
                    Some("not-select") => {
                        return Err(DriverError::rejected(selector, kind, "element is not a <select>"))
                    }
                    _ => {
                        return Err(DriverError::rejected(
                            selector,
                            kind,
                            format!("no option matches '{wanted}'"),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(i64::from(self.jpeg_quality))
            .build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn read_text(&mut self, selector: &str) -> Result<String, DriverError> {
        let element = self
            .find_once(selector)
            .await
            .ok_or_else(|| DriverError::not_found(selector))?;
        Ok(element.inner_text().await?.unwrap_or_default().trim().to_string())
    }

    async fn page_info(&mut self) -> Result<PageInfo, DriverError> {
        let url = self.page.url().await?.unwrap_or_default();
        let title = self.page.get_title().await?.unwrap_or_default();
        Ok(PageInfo { url, title })
    }

    async fn close(mut self: Box<Self>) -> Result<(), DriverError> {
        self.elements.clear();
        let closed = self.browser.close().await;
        if let Err(err) = self.browser.wait().await {
            warn!("chromium did not exit cleanly: {err}");
        }
        self.handler_task.abort();
        closed.map(|_| ()).map_err(DriverError::from)
    }
}

fn select_script(wanted: &str) -> Result<String, DriverError> {
    let literal = serde_json::to_string(wanted)
        .map_err(|err| DriverError::Transport(format!("invalid option encoding: {err}")))?;
    Ok(SELECT_FN.replace("__WANTED__", &literal))
}

/// XPath matching elements whose own text equals `text` after whitespace normalisation.
fn text_xpath(text: &str) -> String {
    format!("//*[normalize-space(text())={}]", xpath_literal(text.trim()))
}

fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

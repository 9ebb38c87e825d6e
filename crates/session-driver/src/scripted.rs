//! In-process driver for tests
//!
//! Every call is recorded. Individual operations can be told to fail with a
//! given error or to hang forever, optionally only for one selector.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use wizard_core_types::InteractionKind;

use crate::errors::DriverError;
use crate::ports::{BrowsingSession, SessionDriver};
use crate::types::{ElementHandle, EngineProfile, PageInfo, SessionConfig};

/// Screenshot bytes start with the JPEG SOI marker, followed by a sequence byte.
const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    Open,
    Navigate,
    Locate,
    Interact,
    Screenshot,
    ReadText,
    PageInfo,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Open {
        headless: bool,
        engine_profile: EngineProfile,
    },
    Navigate {
        url: String,
    },
    Locate {
        selector: String,
    },
    Interact {
        selector: String,
        kind: InteractionKind,
        value: Option<String>,
    },
    Screenshot,
    ReadText {
        selector: String,
    },
    PageInfo,
    Close,
}

#[derive(Debug, Clone)]
enum Behaviour {
    Fail(DriverError),
    Hang,
}

#[derive(Debug, Clone)]
struct Rule {
    op: DriverOp,
    selector: Option<String>,
    behaviour: Behaviour,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<DriverCall>,
    rules: Vec<Rule>,
    texts: HashMap<String, String>,
    missing: HashSet<String>,
    title: String,
    opened: usize,
    closed: usize,
    dropped_open: usize,
    screenshots: u8,
}

impl Script {
    fn behaviour(&self, op: DriverOp, selector: Option<&str>) -> Option<Behaviour> {
        self.rules
            .iter()
            .find(|rule| {
                rule.op == op
                    && match (&rule.selector, selector) {
                        (None, _) => true,
                        (Some(wanted), Some(actual)) => wanted == actual,
                        (Some(_), None) => false,
                    }
            })
            .map(|rule| rule.behaviour.clone())
    }
}

#[derive(Debug, Default)]
struct Shared {
    script: Mutex<Script>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `call` and report how the operation should behave.
    fn enter(&self, call: DriverCall, op: DriverOp, selector: Option<&str>) -> Option<Behaviour> {
        let mut script = self.lock();
        script.calls.push(call);
        script.behaviour(op, selector)
    }
}

async fn act(behaviour: Option<Behaviour>) -> Result<(), DriverError> {
    match behaviour {
        None => Ok(()),
        Some(Behaviour::Fail(err)) => Err(err),
        Some(Behaviour::Hang) => std::future::pending().await,
    }
}

/// Driver whose sessions share one recorded script.
///
/// Clones observe the same state, so a test keeps one clone for assertions
/// and hands another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    shared: Arc<Shared>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(self, op: DriverOp, selector: Option<&str>, behaviour: Behaviour) -> Self {
        self.shared.lock().rules.push(Rule {
            op,
            selector: selector.map(str::to_string),
            behaviour,
        });
        self
    }

    /// Make `op` fail with `error`, for every selector or only `selector`
    pub fn fail_on(self, op: DriverOp, selector: Option<&str>, error: DriverError) -> Self {
        self.rule(op, selector, Behaviour::Fail(error))
    }

    /// Make `op` never complete
    pub fn hang_on(self, op: DriverOp, selector: Option<&str>) -> Self {
        self.rule(op, selector, Behaviour::Hang)
    }

    /// `locate` and `read_text` report `selector` as absent
    pub fn without_element(self, selector: &str) -> Self {
        self.shared.lock().missing.insert(selector.to_string());
        self
    }

    /// Text returned by `read_text(selector)`
    pub fn with_text(self, selector: &str, text: &str) -> Self {
        self.shared
            .lock()
            .texts
            .insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_title(self, title: &str) -> Self {
        self.shared.lock().title = title.to_string();
        self
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.shared.lock().calls.clone()
    }

    pub fn open_count(&self) -> usize {
        self.shared.lock().opened
    }

    pub fn close_count(&self) -> usize {
        self.shared.lock().closed
    }

    /// Sessions dropped without `close`
    pub fn leaked_count(&self) -> usize {
        self.shared.lock().dropped_open
    }

    /// (selector, kind, value) of every attempted interaction, in order
    pub fn interactions(&self) -> Vec<(String, InteractionKind, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DriverCall::Interact {
                    selector,
                    kind,
                    value,
                } => Some((selector, kind, value)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SessionDriver for ScriptedDriver {
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn BrowsingSession>, DriverError> {
        let behaviour = self.shared.enter(
            DriverCall::Open {
                headless: config.headless,
                engine_profile: config.engine_profile,
            },
            DriverOp::Open,
            None,
        );
        act(behaviour).await?;
        self.shared.lock().opened += 1;
        Ok(Box::new(ScriptedSession {
            shared: Arc::clone(&self.shared),
            url: String::from("about:blank"),
            next_id: 0,
            closed: false,
        }))
    }
}

struct ScriptedSession {
    shared: Arc<Shared>,
    url: String,
    next_id: u64,
    closed: bool,
}

impl ScriptedSession {
    fn is_missing(&self, selector: &str) -> bool {
        self.shared.lock().missing.contains(selector)
    }
}

#[async_trait]
impl BrowsingSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let behaviour = self.shared.enter(
            DriverCall::Navigate {
                url: url.to_string(),
            },
            DriverOp::Navigate,
            Some(url),
        );
        act(behaviour).await?;
        self.url = url.to_string();
        Ok(())
    }

    async fn locate(&mut self, selector: &str) -> Result<ElementHandle, DriverError> {
        let behaviour = self.shared.enter(
            DriverCall::Locate {
                selector: selector.to_string(),
            },
            DriverOp::Locate,
            Some(selector),
        );
        act(behaviour).await?;
        if self.is_missing(selector) {
            return Err(DriverError::not_found(selector));
        }
        self.next_id += 1;
        Ok(ElementHandle {
            id: self.next_id,
            selector: selector.to_string(),
        })
    }

    async fn interact(
        &mut self,
        element: &ElementHandle,
        kind: InteractionKind,
        value: Option<&str>,
    ) -> Result<(), DriverError> {
        let behaviour = self.shared.enter(
            DriverCall::Interact {
                selector: element.selector.clone(),
                kind,
                value: value.map(str::to_string),
            },
            DriverOp::Interact,
            Some(&element.selector),
        );
        act(behaviour).await?;
        if kind.takes_value() && value.is_none() {
            return Err(DriverError::rejected(
                element.selector.clone(),
                kind,
                "interaction requires a value",
            ));
        }
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let behaviour = self
            .shared
            .enter(DriverCall::Screenshot, DriverOp::Screenshot, None);
        act(behaviour).await?;
        let mut script = self.shared.lock();
        script.screenshots = script.screenshots.wrapping_add(1);
        let mut bytes = JPEG_MAGIC.to_vec();
        bytes.push(script.screenshots);
        Ok(bytes)
    }

    async fn read_text(&mut self, selector: &str) -> Result<String, DriverError> {
        let behaviour = self.shared.enter(
            DriverCall::ReadText {
                selector: selector.to_string(),
            },
            DriverOp::ReadText,
            Some(selector),
        );
        act(behaviour).await?;
        let script = self.shared.lock();
        if script.missing.contains(selector) {
            return Err(DriverError::not_found(selector));
        }
        match script.texts.get(selector) {
            Some(text) => Ok(text.clone()),
            None if selector == "body" => Ok(format!("Scripted page at {}", self.url)),
            None => Err(DriverError::not_found(selector)),
        }
    }

    async fn page_info(&mut self) -> Result<PageInfo, DriverError> {
        let behaviour = self
            .shared
            .enter(DriverCall::PageInfo, DriverOp::PageInfo, None);
        act(behaviour).await?;
        Ok(PageInfo {
            url: self.url.clone(),
            title: self.shared.lock().title.clone(),
        })
    }

    async fn close(mut self: Box<Self>) -> Result<(), DriverError> {
        self.closed = true;
        let behaviour = {
            let mut script = self.shared.lock();
            script.closed += 1;
            script.calls.push(DriverCall::Close);
            script.behaviour(DriverOp::Close, None)
        };
        act(behaviour).await
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        if !self.closed {
            self.shared.lock().dropped_open += 1;
        }
    }
}

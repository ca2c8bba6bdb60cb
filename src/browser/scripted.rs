//! Programmable in-process browser session for tests.
//!
//! Pages are scripted up front: each URL maps to a set of elements keyed by
//! the literal selector string a resolver will ask for, plus an optional
//! redirect target. Navigation, clicks, and context switches are recorded
//! so tests can assert on the exact interaction sequence without a real
//! driver process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserError, BrowserSession, ElementHandle};

/// One scripted element on a page. Selector matching is literal string
/// equality, not CSS evaluation.
#[derive(Debug, Clone, Default)]
pub struct ScriptedElement {
    selector: String,
    attrs: HashMap<String, String>,
    opens: Option<String>,
}

impl ScriptedElement {
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Self::default()
        }
    }

    /// Adds an attribute visible through [`BrowserSession::attribute`].
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Makes a click on this element open `url` in a new context.
    #[must_use]
    pub fn opens(mut self, url: impl Into<String>) -> Self {
        self.opens = Some(url.into());
        self
    }
}

/// A scripted page: optional redirect plus its elements.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    resolved_url: Option<String>,
    elements: Vec<ScriptedElement>,
}

impl ScriptedPage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigating to this page lands on `url` instead.
    #[must_use]
    pub fn redirects_to(mut self, url: impl Into<String>) -> Self {
        self.resolved_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn element(mut self, element: ScriptedElement) -> Self {
        self.elements.push(element);
        self
    }
}

#[derive(Debug, Default)]
struct State {
    // Context stack of resolved URLs; `focused` indexes into it.
    contexts: Vec<String>,
    focused: usize,
    // Issued handles: id -> (page url, element index).
    handles: Vec<(String, usize)>,
    visited: Vec<String>,
    clicked: Vec<String>,
}

/// In-process [`BrowserSession`] driven entirely by scripted pages.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    pages: HashMap<String, ScriptedPage>,
    state: Mutex<State>,
}

impl ScriptedSession {
    #[must_use]
    pub fn new() -> Self {
        let session = Self::default();
        session.state_mut().contexts.push("about:blank".to_string());
        session
    }

    /// Scripts `page` at `url`. Navigating anywhere unscripted is allowed
    /// and behaves as a blank page.
    #[must_use]
    pub fn page(mut self, url: impl Into<String>, page: ScriptedPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    /// URLs passed to [`BrowserSession::goto`], in order.
    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.state_mut().visited.clone()
    }

    /// Selectors of elements that were clicked, in order.
    #[must_use]
    pub fn clicked(&self) -> Vec<String> {
        self.state_mut().clicked.clone()
    }

    fn state_mut(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, url: &str) -> String {
        self.pages
            .get(url)
            .and_then(|p| p.resolved_url.clone())
            .unwrap_or_else(|| url.to_string())
    }

    fn focused_page(&self, state: &State) -> Option<&ScriptedPage> {
        let url = state.contexts.get(state.focused)?;
        self.pages.get(url)
    }

    fn element_at(&self, handle: &ElementHandle) -> Result<&ScriptedElement, BrowserError> {
        let state = self.state_mut();
        let index: usize = handle
            .id()
            .strip_prefix('e')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| BrowserError::Operation(format!("unknown handle {}", handle.id())))?;
        let (url, element_index) = state
            .handles
            .get(index)
            .cloned()
            .ok_or_else(|| BrowserError::Operation(format!("stale handle {}", handle.id())))?;
        drop(state);
        self.pages
            .get(&url)
            .and_then(|p| p.elements.get(element_index))
            .ok_or_else(|| BrowserError::Operation(format!("stale handle {}", handle.id())))
    }

    fn issue_handle(&self, page_url: &str, element_index: usize) -> ElementHandle {
        let mut state = self.state_mut();
        let id = format!("e{}", state.handles.len());
        state.handles.push((page_url.to_string(), element_index));
        ElementHandle::new(id)
    }

    fn matches(&self, selector: &str) -> Vec<(String, usize)> {
        let state = self.state_mut();
        let Some(url) = state.contexts.get(state.focused).cloned() else {
            return Vec::new();
        };
        let Some(page) = self.focused_page(&state) else {
            return Vec::new();
        };
        page.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.selector == selector)
            .map(|(i, _)| (url.clone(), i))
            .collect()
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let resolved = self.resolve(url);
        let mut state = self.state_mut();
        state.visited.push(url.to_string());
        let focused = state.focused;
        if let Some(slot) = state.contexts.get_mut(focused) {
            *slot = resolved;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let state = self.state_mut();
        state
            .contexts
            .get(state.focused)
            .cloned()
            .ok_or(BrowserError::Closed)
    }

    async fn find(&self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        Ok(self
            .matches(selector)
            .first()
            .map(|(url, index)| self.issue_handle(url, *index)))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        Ok(self
            .matches(selector)
            .iter()
            .map(|(url, index)| self.issue_handle(url, *index))
            .collect())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.element_at(element)?.attrs.get(name).cloned())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        let scripted = self.element_at(element)?.clone();
        let mut state = self.state_mut();
        state.clicked.push(scripted.selector.clone());
        if let Some(target) = scripted.opens {
            let resolved = self.resolve(&target);
            state.contexts.push(resolved);
        }
        Ok(())
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        self.find(selector)
            .await?
            .ok_or_else(|| BrowserError::Timeout {
                what: format!("element matching `{selector}`"),
                timeout,
            })
    }

    async fn wait_for_context_count(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        if self.state_mut().contexts.len() >= count {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                what: format!("{count} browser contexts"),
                timeout,
            })
        }
    }

    async fn focus_latest_context(&self) -> Result<(), BrowserError> {
        let mut state = self.state_mut();
        state.focused = state.contexts.len().saturating_sub(1);
        Ok(())
    }

    async fn close_extra_contexts(&self) -> Result<(), BrowserError> {
        let mut state = self.state_mut();
        state.contexts.truncate(1);
        state.focused = 0;
        Ok(())
    }
}

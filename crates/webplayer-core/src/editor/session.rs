//! Editor session lifecycle: mount, decorate, edit, unmount.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::document::{
    self, DocumentKey, DocumentObserver, DocumentRegistry, Edit, LanguageMode, SharedDocument,
    TextDocument, ViewId,
};
use crate::error::{Error, Result};

use super::props::{EditorProps, LineRange};
use super::surface::{CHANGED_LINE_CLASS, ERROR_LINE_CLASS, EditingSurface, LineLayer};

/// Host callback receiving the full text after every committed change.
type ChangeCallback = Box<dyn FnMut(&str)>;

/// A session's slot in a document's linked-view set. Unlinks on drop.
struct ViewLink {
    document: Weak<RefCell<TextDocument>>,
    view: ViewId,
}

impl Drop for ViewLink {
    fn drop(&mut self) {
        let Some(document) = self.document.upgrade() else {
            return;
        };
        match document.try_borrow_mut() {
            Ok(mut document) => {
                document.unlink_view(self.view);
                tracing::debug!(
                    "Unlinked {} from {} ({} linked)",
                    self.view,
                    document.key(),
                    document.linked_views()
                );
            }
            Err(_) => tracing::warn!("Document busy, {} left linked", self.view),
        }
    }
}

/// What a mounted view shows.
struct ViewState<S> {
    surface: S,
    read_only: bool,
    /// Ranges currently highlighted as changed.
    current_diff: Vec<LineRange>,
    /// Line currently marked with the error class.
    error_line: Option<usize>,
    /// Document revision last shown on the surface.
    seen_revision: u64,
}

impl<S: EditingSurface> ViewState<S> {
    fn clear_diff(&mut self) {
        for range in std::mem::take(&mut self.current_diff) {
            for line in range.lines() {
                self.surface
                    .remove_line_class(line, LineLayer::Background, CHANGED_LINE_CLASS);
                self.surface
                    .remove_line_class(line, LineLayer::Gutter, CHANGED_LINE_CLASS);
            }
        }
    }

    fn mark_error(&mut self, line: Option<usize>) {
        if let Some(previous) = self.error_line.take() {
            self.surface
                .remove_line_class(previous, LineLayer::Background, ERROR_LINE_CLASS);
        }
        if let Some(line) = line {
            self.surface
                .add_line_class(line, LineLayer::Background, ERROR_LINE_CLASS);
            self.error_line = Some(line);
        }
    }

    fn highlight(&mut self, ranges: &[LineRange]) {
        for range in ranges {
            for line in range.lines() {
                self.surface
                    .add_line_class(line, LineLayer::Gutter, CHANGED_LINE_CLASS);
                self.surface
                    .add_line_class(line, LineLayer::Background, CHANGED_LINE_CLASS);
            }
        }

        if let (Some(first), Some(last)) = (ranges.first(), ranges.last()) {
            let from_line = first.from;
            let to_line = last.to;
            let client_height = self.surface.scroll_info().client_height;
            let visible_height =
                self.surface.height_at_line(to_line) - self.surface.height_at_line(from_line);

            let target = if visible_height < client_height {
                from_line + to_line.saturating_sub(from_line) / 2
            } else {
                from_line
            };
            self.surface.scroll_into_view(target, client_height / 2.0);
        }

        self.current_diff = ranges.to_vec();
    }
}

/// View state shared between a session and the document's observer list.
///
/// The change callback sits in its own cell so it can read the session while
/// it runs.
struct SharedView<S> {
    state: RefCell<ViewState<S>>,
    on_change: RefCell<ChangeCallback>,
}

impl<S: EditingSurface> SharedView<S> {
    /// Show `text` if `revision` is newer than what is on screen.
    fn refresh(&self, text: &str, revision: u64) -> bool {
        {
            let Ok(mut state) = self.state.try_borrow_mut() else {
                tracing::warn!("View busy, revision {} not shown", revision);
                return false;
            };
            if revision <= state.seen_revision {
                return false;
            }
            state.seen_revision = revision;
            state.clear_diff();
            state.surface.display(text);
        }
        self.notify(text);
        true
    }

    fn notify(&self, text: &str) {
        match self.on_change.try_borrow_mut() {
            Ok(mut on_change) => (on_change)(text),
            Err(_) => tracing::warn!("Change callback re-entered, nested change not reported"),
        }
    }
}

impl<S: EditingSurface> DocumentObserver for SharedView<S> {
    fn document_changed(&self, text: &str, revision: u64) {
        self.refresh(text, revision);
    }
}

/// A mounted editor view over a registry document.
///
/// The session does not own the document: the registry does, and the session
/// holds one linked view into it. A change committed through any linked view
/// is redrawn on every other one and reported to each view's change callback.
/// Mounting is [`EditorSession::mount`]; unmounting consumes the session, so no
/// operation can run on an unmounted one.
pub struct EditorSession<S: EditingSurface + 'static> {
    view: Rc<SharedView<S>>,
    link: ViewLink,
    key: DocumentKey,
    mode: LanguageMode,
}

impl<S: EditingSurface + 'static> EditorSession<S> {
    /// Mount `surface` on the document named by `props`, creating the document if absent.
    ///
    /// Diff highlighting is applied only when the document has no undoable
    /// history, so a diff is never drawn over content the user has edited.
    pub fn mount(
        registry: &mut DocumentRegistry,
        props: &EditorProps,
        mut surface: S,
        on_change: impl FnMut(&str) + 'static,
    ) -> Self {
        let key = props.document_key();
        let document = registry.get_or_create(key.clone(), props.seed_content(), props.mode.clone());

        let (pristine, revision, mode) = {
            let doc = document.borrow();
            surface.attach(doc.text(), doc.mode(), props.read_only);
            (doc.history_size().undo == 0, doc.revision(), doc.mode().clone())
        };

        let view = Rc::new(SharedView {
            state: RefCell::new(ViewState {
                surface,
                read_only: props.read_only,
                current_diff: Vec::new(),
                error_line: None,
                seen_revision: revision,
            }),
            on_change: RefCell::new(Box::new(on_change) as ChangeCallback),
        });
        let observer: Rc<dyn DocumentObserver> = view.clone();
        let id = registry.link_view(&document, Rc::downgrade(&observer));

        let mut session = Self {
            view,
            link: ViewLink {
                document: Rc::downgrade(&document),
                view: id,
            },
            key,
            mode,
        };

        if pristine {
            session.apply_diff_highlight(&props.diff, props.show_diff);
        }
        session.apply_error_decoration(props.error_line_number);

        tracing::debug!("Mounted editor on {} as {}", session.key, id);
        session
    }

    /// Swap the surface onto an empty disposable document and release this
    /// session's view. The shared document keeps its content.
    ///
    /// Fails with [`Error::ViewBusy`] when called from this view's own change
    /// callback; the view is released either way.
    pub fn unmount(self) -> Result<S> {
        let Self {
            view,
            link,
            key,
            mode,
        } = self;

        {
            let mut state = view
                .state
                .try_borrow_mut()
                .map_err(|_| Error::ViewBusy(key.to_string()))?;
            let read_only = state.read_only;
            state.surface.attach("", &mode, read_only);
        }
        tracing::debug!("Unmounting editor from {}", key);
        drop(link);

        match Rc::try_unwrap(view) {
            Ok(view) => Ok(view.state.into_inner().surface),
            Err(_) => Err(Error::ViewBusy(key.to_string())),
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn view(&self) -> ViewId {
        self.link.view
    }

    pub fn surface(&self) -> Ref<'_, S> {
        Ref::map(self.view.state.borrow(), |state| &state.surface)
    }

    pub fn surface_mut(&mut self) -> RefMut<'_, S> {
        RefMut::map(self.view.state.borrow_mut(), |state| &mut state.surface)
    }

    pub fn is_read_only(&self) -> bool {
        self.view.state.borrow().read_only
    }

    pub fn error_line(&self) -> Option<usize> {
        self.view.state.borrow().error_line
    }

    /// Ranges currently highlighted as changed.
    pub fn highlighted_ranges(&self) -> Vec<LineRange> {
        self.view.state.borrow().current_diff.clone()
    }

    /// The shared document, if the registry still holds it.
    pub fn document(&self) -> Result<SharedDocument> {
        self.link
            .document
            .upgrade()
            .ok_or_else(|| Error::DocumentReleased(self.key.to_string()))
    }

    /// Current text of the shared document.
    pub fn value(&self) -> Result<String> {
        Ok(self.document()?.borrow().text().to_string())
    }

    /// Apply a user edit.
    pub fn edit(&mut self, edit: Edit) -> Result<bool> {
        self.ensure_writable()?;
        self.commit(|doc| doc.apply(edit))
    }

    /// Undo the newest change in the shared history, whichever view made it.
    pub fn undo(&mut self) -> Result<bool> {
        self.ensure_writable()?;
        self.commit(|doc| Ok(doc.undo()))
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.ensure_writable()?;
        self.commit(|doc| Ok(doc.redo()))
    }

    /// Replace the content with a host-driven value if it differs from what
    /// the surface shows.
    ///
    /// Goes through the normal change pipeline. Read-only sessions accept it.
    pub fn set_external_value(&mut self, value: Option<&str>) -> Result<bool> {
        let Some(value) = value else {
            return Ok(false);
        };
        if self.surface().content() == value {
            return Ok(false);
        }
        if self.commit(|doc| Ok(doc.set_value(value)))? {
            return Ok(true);
        }

        // The document already holds `value`; only this surface is behind.
        self.view.state.borrow_mut().surface.display(value);
        self.content_changed(value);
        Ok(true)
    }

    /// Redraw from the document if it moved past what this view shows.
    ///
    /// Linked views are redrawn as changes commit; this covers changes made
    /// directly on the document.
    pub fn sync(&mut self) -> Result<bool> {
        let document = self.document()?;
        let (revision, text) = {
            let doc = document.borrow();
            (doc.revision(), doc.text().to_string())
        };
        Ok(self.view.refresh(&text, revision))
    }

    /// Apply the host's next properties: error line, read-only flag, then external value.
    pub fn update(&mut self, props: &EditorProps) -> Result<()> {
        self.apply_error_decoration(props.error_line_number);
        {
            let mut state = self.view.state.borrow_mut();
            if props.read_only != state.read_only {
                state.read_only = props.read_only;
                state.surface.set_read_only(props.read_only);
            }
        }
        self.set_external_value(props.value.as_deref())?;
        Ok(())
    }

    /// Move the error marker to `line`, or remove it with `None`.
    pub fn apply_error_decoration(&mut self, line: Option<usize>) {
        self.view.state.borrow_mut().mark_error(line);
    }

    /// Highlight every line of every range, then scroll the highlight into view.
    ///
    /// If the span from the first range's start to the last range's end fits in
    /// the viewport, its middle line is centred; otherwise its first line is.
    pub fn apply_diff_highlight(&mut self, ranges: &[LineRange], enabled: bool) {
        if enabled {
            self.view.state.borrow_mut().highlight(ranges);
        }
    }

    /// Runs right before a change is shown: drops the diff highlight.
    pub fn before_content_change(&mut self) {
        self.view.state.borrow_mut().clear_diff();
    }

    /// Runs after a change is shown: forwards the text to the host.
    pub fn content_changed(&mut self, text: &str) {
        self.view.notify(text);
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_read_only() {
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn commit(&mut self, change: impl FnOnce(&mut TextDocument) -> Result<bool>) -> Result<bool> {
        let document = self.document()?;
        document::commit(&document, change)
    }
}

impl<S: EditingSurface + 'static> fmt::Debug for EditorSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("EditorSession");
        out.field("key", &self.key).field("view", &self.link.view);
        if let Ok(state) = self.view.state.try_borrow() {
            out.field("read_only", &state.read_only)
                .field("current_diff", &state.current_diff)
                .field("error_line", &state.error_line);
        }
        out.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::editor::HeadlessSurface;

    fn mount(registry: &mut DocumentRegistry, props: &EditorProps) -> EditorSession<HeadlessSurface> {
        EditorSession::mount(registry, props, HeadlessSurface::default(), |_| {})
    }

    fn diff_props(initial: &str) -> EditorProps {
        let mut props = EditorProps::new("App.js");
        props.initial_value = Some(initial.to_string());
        props.show_diff = true;
        props.diff = vec![LineRange::new(0, 1)];
        props
    }

    #[test]
    fn test_error_decoration_is_idempotent() {
        let mut registry = DocumentRegistry::new();
        let mut session = mount(&mut registry, &EditorProps::new("App.js"));

        session.apply_error_decoration(Some(3));
        session.apply_error_decoration(Some(3));
        assert_eq!(
            session.surface().lines_with(LineLayer::Background, ERROR_LINE_CLASS),
            vec![3]
        );

        session.apply_error_decoration(Some(5));
        assert_eq!(
            session.surface().lines_with(LineLayer::Background, ERROR_LINE_CLASS),
            vec![5]
        );

        session.apply_error_decoration(None);
        assert!(session
            .surface()
            .lines_with(LineLayer::Background, ERROR_LINE_CLASS)
            .is_empty());
        assert_eq!(session.error_line(), None);
    }

    #[test]
    fn test_diff_centres_small_span() {
        let mut registry = DocumentRegistry::new();
        let mut props = EditorProps::new("App.js");
        props.show_diff = true;
        props.diff = vec![LineRange::new(2, 3), LineRange::new(6, 8)];

        let session = mount(&mut registry, &props);
        let surface = session.surface();

        assert_eq!(
            surface.lines_with(LineLayer::Gutter, CHANGED_LINE_CLASS),
            vec![2, 3, 6, 7, 8]
        );
        assert_eq!(
            surface.lines_with(LineLayer::Background, CHANGED_LINE_CLASS),
            vec![2, 3, 6, 7, 8]
        );
        // Span 2..=8 is 120px in a 400px viewport: centre on line 5.
        assert_eq!(surface.scrolls, vec![(5, 200.0)]);
    }

    #[test]
    fn test_diff_scrolls_to_first_line_of_tall_span() {
        let mut registry = DocumentRegistry::new();
        let mut props = EditorProps::new("App.js");
        props.show_diff = true;
        props.diff = vec![LineRange::new(10, 60)];

        let session = mount(&mut registry, &props);
        assert_eq!(session.surface().scrolls, vec![(10, 200.0)]);
    }

    #[test]
    fn test_diff_disabled_draws_nothing() {
        let mut registry = DocumentRegistry::new();
        let mut props = EditorProps::new("App.js");
        props.diff = vec![LineRange::new(0, 1)];

        let session = mount(&mut registry, &props);
        assert!(session.surface().classes.is_empty());
        assert!(session.surface().scrolls.is_empty());
        assert!(session.highlighted_ranges().is_empty());
    }

    #[test]
    fn test_edit_clears_diff_and_notifies() {
        let mut registry = DocumentRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut session = EditorSession::mount(
            &mut registry,
            &diff_props("a\nb\nc"),
            HeadlessSurface::default(),
            move |text| sink.borrow_mut().push(text.to_string()),
        );
        assert!(!session.surface().classes.is_empty());

        assert!(session.edit(Edit::insert(0, "// ")).unwrap());
        assert!(session.surface().classes.is_empty());
        assert!(session.highlighted_ranges().is_empty());
        assert_eq!(session.surface().text, "// a\nb\nc");
        assert_eq!(*seen.borrow(), vec!["// a\nb\nc".to_string()]);
    }

    #[test]
    fn test_rejected_or_empty_edit_keeps_diff() {
        let mut registry = DocumentRegistry::new();
        let mut session = mount(&mut registry, &diff_props("a\nb\nc"));

        assert!(matches!(
            session.edit(Edit::delete(0, 99)),
            Err(Error::InvalidEdit { .. })
        ));
        assert!(!session.edit(Edit::replace(0, 1, "a")).unwrap());
        assert!(!session.undo().unwrap());

        assert_eq!(session.highlighted_ranges(), vec![LineRange::new(0, 1)]);
        assert_eq!(
            session
                .surface()
                .lines_with(LineLayer::Gutter, CHANGED_LINE_CLASS),
            vec![0, 1]
        );
    }

    #[test]
    fn test_read_only_rejects_edits_but_accepts_external_value() {
        let mut registry = DocumentRegistry::new();
        let mut props = EditorProps::new("App.js");
        props.read_only = true;

        let mut session = mount(&mut registry, &props);
        assert!(matches!(
            session.edit(Edit::insert(0, "x")),
            Err(Error::ReadOnly)
        ));
        assert!(matches!(session.undo(), Err(Error::ReadOnly)));

        assert!(session.set_external_value(Some("live")).unwrap());
        assert_eq!(session.value().unwrap(), "live");
        assert_eq!(session.surface().text, "live");
    }

    #[test]
    fn test_external_value_ignored_when_equal_or_missing() {
        let mut registry = DocumentRegistry::new();
        let mut props = EditorProps::new("App.js");
        props.initial_value = Some("same".to_string());

        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let mut session = EditorSession::mount(
            &mut registry,
            &props,
            HeadlessSurface::default(),
            move |_| *counter.borrow_mut() += 1,
        );

        assert!(!session.set_external_value(Some("same")).unwrap());
        assert!(!session.set_external_value(None).unwrap());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_external_value_compares_against_surface() {
        let mut registry = DocumentRegistry::new();
        let mut props = EditorProps::new("App.js");
        props.initial_value = Some("same".to_string());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut session = EditorSession::mount(
            &mut registry,
            &props,
            HeadlessSurface::default(),
            move |text| sink.borrow_mut().push(text.to_string()),
        );
        session.surface_mut().text = "typed".to_string();

        assert!(session.set_external_value(Some("same")).unwrap());
        assert_eq!(session.surface().text, "same");
        assert_eq!(session.value().unwrap(), "same");
        assert_eq!(*seen.borrow(), vec!["same".to_string()]);
    }

    #[test]
    fn test_callback_may_read_its_session() {
        let mut registry = DocumentRegistry::new();
        let slot: Rc<RefCell<Option<Rc<RefCell<EditorSession<HeadlessSurface>>>>>> =
            Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_slot = slot.clone();
        let sink = seen.clone();
        let session = Rc::new(RefCell::new(EditorSession::mount(
            &mut registry,
            &EditorProps::new("App.js"),
            HeadlessSurface::default(),
            move |_| {
                if let Some(session) = inner_slot.borrow().as_ref() {
                    let shown = session.borrow().surface().text.clone();
                    sink.borrow_mut().push(shown);
                }
            },
        )));
        *slot.borrow_mut() = Some(session.clone());

        let document = session.borrow().document().unwrap();
        document::commit(&document, |doc| Ok(doc.set_value("x"))).unwrap();
        assert_eq!(*seen.borrow(), vec!["x".to_string()]);

        slot.borrow_mut().take();
    }

    #[test]
    fn test_released_document() {
        let mut registry = DocumentRegistry::new();
        let session = mount(&mut registry, &EditorProps::new("App.js"));
        drop(registry);
        assert!(matches!(session.value(), Err(Error::DocumentReleased(_))));
    }
}

//! Client-side view state shared through Leptos context.

use leptos::prelude::*;

use crate::filter::{FilterState, search};
use crate::schools::School;

/// Which scene fills the page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
	#[default]
	/// Clustered markers on a globe.
	Globe,
	/// The force-directed network.
	Network,
}

impl ViewMode {
	/// Button text.
	pub fn label(self) -> &'static str {
		match self {
			ViewMode::Globe => "Globe",
			ViewMode::Network => "Network",
		}
	}
}

#[derive(Clone, Copy)]
/// Signals shared by every view. Cheap to copy.
pub struct ViewStore {
	/// Every loaded school; filters never remove from here.
	pub schools: RwSignal<Vec<School>>,
	/// Active filter chips.
	pub filters: RwSignal<FilterState>,
	/// Search box text.
	pub query: RwSignal<String>,
	/// Selected school id.
	pub selected: RwSignal<Option<String>>,
	/// Id of the school under the pointer on the globe.
	pub hovered: RwSignal<Option<String>>,
	/// Whether the camera drifts on its own.
	pub auto_rotate: RwSignal<bool>,
	/// Which scene is shown.
	pub view: RwSignal<ViewMode>,
	/// Id of the globe cluster whose overlay is open.
	pub open_cluster: RwSignal<Option<String>>,
}

impl ViewStore {
	/// Everything visible, nothing selected, auto-rotation on.
	pub fn new(schools: Vec<School>) -> Self {
		Self {
			schools: RwSignal::new(schools),
			filters: RwSignal::new(FilterState::default()),
			query: RwSignal::new(String::new()),
			selected: RwSignal::new(None),
			hovered: RwSignal::new(None),
			auto_rotate: RwSignal::new(true),
			view: RwSignal::new(ViewMode::default()),
			open_cluster: RwSignal::new(None),
		}
	}

	/// Schools passing the filters and search query. Tracks all three signals.
	pub fn visible_schools(&self) -> Vec<School> {
		let query = self.query.get();
		let filters = self.filters.get();
		self.schools.with(|all| search(all, &filters, &query).into_iter().cloned().collect())
	}

	/// The selected school record, if any.
	pub fn selected_school(&self) -> Option<School> {
		let id = self.selected.get()?;
		self.schools.with(|all| all.iter().find(|s| s.id == id).cloned())
	}

	/// Select a school, or clear the selection when it is already selected.
	pub fn toggle_selected(&self, id: &str) {
		self.selected.update(|selected| {
			if selected.as_deref() == Some(id) {
				*selected = None;
			} else {
				*selected = Some(id.to_string());
			}
		});
	}

	/// Flip auto-rotation.
	pub fn toggle_auto_rotate(&self) {
		self.auto_rotate.update(|on| *on = !*on);
	}

	/// Clear every filter and the search query.
	pub fn reset_filters(&self) {
		self.filters.set(FilterState::default());
		self.query.set(String::new());
	}
}

/// Create the store and put it in context.
pub fn provide_view_store(schools: Vec<School>) -> ViewStore {
	let store = ViewStore::new(schools);
	provide_context(store);
	store
}

/// The store provided by an ancestor.
pub fn use_view_store() -> ViewStore {
	expect_context::<ViewStore>()
}

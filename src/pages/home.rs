use leptos::prelude::*;
use log::error;
use wasm_bindgen::JsCast;
use web_sys::{HtmlInputElement, KeyboardEvent};

use crate::components::controls::{FilterPanel, SearchBox, ViewToggle};
use crate::components::globe::SchoolGlobe;
use crate::components::network::UniversityNetwork;
use crate::components::soundtrack::{Soundtrack, provide_audio};
use crate::components::window::WindowListener;
use crate::schools::{BUNDLED_SCHOOLS, School, load_schools};
use crate::store::{ViewMode, ViewStore, provide_view_store, use_view_store};

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let loaded = load_schools(BUNDLED_SCHOOLS).inspect_err(|e| error!("Failed to load schools: {e}"));
	provide_view_store(loaded.as_ref().cloned().unwrap_or_default());

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			{loaded.map(|_| view! { <Explorer /> })}
		</ErrorBoundary>
	}
}

/// `R` toggles auto-rotation in either view, except while typing in a field.
fn rotation_shortcut(store: ViewStore) -> Option<WindowListener> {
	WindowListener::new("keydown", move |ev| {
		let Some(ev) = ev.dyn_ref::<KeyboardEvent>() else {
			return;
		};
		let typing = ev
			.target()
			.is_some_and(|t| t.dyn_ref::<HtmlInputElement>().is_some());
		if !typing && ev.key().eq_ignore_ascii_case("r") {
			store.toggle_auto_rotate();
		}
	})
}

#[component]
fn Explorer() -> impl IntoView {
	let store = use_view_store();
	provide_audio();
	let shortcut = StoredValue::new_local(rotation_shortcut(store));
	on_cleanup(move || shortcut.dispose());
	let count = move || store.visible_schools().len();

	view! {
		<div class="fullscreen-scene">
			{move || match store.view.get() {
				ViewMode::Globe => view! { <SchoolGlobe /> }.into_any(),
				ViewMode::Network => view! { <UniversityNetwork /> }.into_any(),
			}}
			<aside class="scene-overlay">
				<h1>"Art Schools in Germany"</h1>
				<p class="subtitle">
					{move || format!("{} of {} schools", count(), store.schools.with(Vec::len))}
				</p>
				<ViewToggle />
				<SearchBox />
				<FilterPanel />
				<Soundtrack />
			</aside>
			<SchoolCard />
		</div>
	}
}

/// Details for the selected school.
#[component]
fn SchoolCard() -> impl IntoView {
	let store = use_view_store();

	move || {
		store.selected_school().map(|school| {
			let programs = school
				.programs
				.iter()
				.map(|p| {
					let degree = p.degree.clone().map(|d| format!(" ({d})")).unwrap_or_default();
					view! { <li>{format!("{}{degree}", p.name)}</li> }
				})
				.collect_view();
			let facts = school_facts(&school);

			view! {
				<div class="school-card">
					<button class="close" on:click=move |_| store.selected.set(None)>"×"</button>
					<h2>{school.name.clone()}</h2>
					<p class="kind">{school.kind.label()} " · " {school.language().label()}</p>
					<p>{facts}</p>
					<ul>{programs}</ul>
					{school.website.clone().map(|url| {
						let href = url.clone();
						view! { <a href=href target="_blank" rel="noopener">{url}</a> }
					})}
				</div>
			}
		})
	}
}

/// City, region, founding year and size, as far as they are known.
fn school_facts(school: &School) -> String {
	[
		school.city.clone(),
		Some(school.region.clone()),
		school.founded.map(|y| format!("founded {y}")),
		school.students.map(|n| format!("{n} students")),
	]
	.into_iter()
	.flatten()
	.collect::<Vec<_>>()
	.join(" · ")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schools::{SchoolKind, test_school};

	#[test]
	fn facts_skip_unknown_fields() {
		let mut school = test_school("x", "Hesse", SchoolKind::ArtAcademy, 50.1, 8.7);
		assert_eq!(school_facts(&school), "Hesse");
		school.city = Some("Frankfurt am Main".into());
		school.students = Some(200);
		assert_eq!(school_facts(&school), "Frankfurt am Main · Hesse · 200 students");
	}

	#[test]
	fn bundled_schools_all_have_facts_and_links() {
		for school in load_schools(BUNDLED_SCHOOLS).unwrap() {
			assert!(school_facts(&school).contains(&school.region));
			assert!(school.website.is_some_and(|url| url.starts_with("http")));
		}
	}
}

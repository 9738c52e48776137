use std::collections::BTreeSet;

use leptos::prelude::*;

use crate::filter::regions;
use crate::schools::{Language, SchoolKind};
use crate::store::{ViewMode, use_view_store};

const MAX_RESULTS: usize = 8;

/// Search box with a short result list. Picking a result selects the school.
#[component]
pub fn SearchBox() -> impl IntoView {
	let store = use_view_store();
	let results = Memo::new(move |_| {
		if store.query.with(|q| q.trim().is_empty()) {
			return Vec::new();
		}
		let mut hits = store.visible_schools();
		hits.truncate(MAX_RESULTS);
		hits
	});

	view! {
		<div class="search">
			<input
				type="search"
				placeholder="Search schools, cities, programs"
				prop:value=move || store.query.get()
				on:input=move |ev| store.query.set(event_target_value(&ev))
			/>
			<ul class="search-results">
				<For
					each=move || results.get()
					key=|school| school.id.clone()
					children=move |school| {
						let id = school.id.clone();
						view! {
							<li on:click=move |_| {
								store.selected.set(Some(id.clone()));
								store.query.set(String::new());
							}>
								<span>{school.name}</span>
								<small>{school.city.unwrap_or(school.region)}</small>
							</li>
						}
					}
				/>
			</ul>
		</div>
	}
}

#[component]
fn Chip(
	#[prop(into)] label: String,
	#[prop(into)] active: Signal<bool>,
	on_toggle: Callback<()>,
) -> impl IntoView {
	view! {
		<button
			class="chip"
			class:active=move || active.get()
			on:click=move |_| on_toggle.run(())
		>
			{label}
		</button>
	}
}

/// Region, institution type, program type and language filters.
#[component]
pub fn FilterPanel() -> impl IntoView {
	let store = use_view_store();
	let all_regions = Memo::new(move |_| store.schools.with(|s| regions(s)));
	let program_types = Memo::new(move |_| {
		store.schools.with(|s| {
			s.iter()
				.filter_map(|school| school.program_type.clone())
				.collect::<BTreeSet<_>>()
				.into_iter()
				.collect::<Vec<_>>()
		})
	});
	let languages = [Language::German, Language::English, Language::Bilingual];

	view! {
		<div class="filters">
			<section>
				<h4>"Region"</h4>
				<For
					each=move || all_regions.get()
					key=|region| region.clone()
					children=move |region| {
						let (r, t) = (region.clone(), region.clone());
						view! {
							<Chip
								label=region
								active=Signal::derive(move || store.filters.with(|f| f.regions.contains(&r)))
								on_toggle=Callback::new(move |_| store.filters.update(|f| f.toggle_region(&t)))
							/>
						}
					}
				/>
			</section>
			<section>
				<h4>"Institution"</h4>
				{SchoolKind::ALL
					.into_iter()
					.map(|kind| {
						view! {
							<Chip
								label=kind.label()
								active=Signal::derive(move || {
									store.filters.with(|f| f.institution_types.contains(&kind))
								})
								on_toggle=Callback::new(move |_| store.filters.update(|f| f.toggle_kind(kind)))
							/>
						}
					})
					.collect_view()}
			</section>
			<section>
				<h4>"Program"</h4>
				<For
					each=move || program_types.get()
					key=|t| t.clone()
					children=move |program_type| {
						let (p, t) = (program_type.clone(), program_type.clone());
						view! {
							<Chip
								label=program_type
								active=Signal::derive(move || store.filters.with(|f| f.program_types.contains(&p)))
								on_toggle=Callback::new(move |_| {
									store.filters.update(|f| f.toggle_program_type(&t))
								})
							/>
						}
					}
				/>
			</section>
			<section>
				<h4>"Language"</h4>
				{languages
					.into_iter()
					.map(|language| {
						view! {
							<Chip
								label=language.label()
								active=Signal::derive(move || store.filters.with(|f| f.language == Some(language)))
								on_toggle=Callback::new(move |_| {
									store.filters.update(|f| {
										f.language = if f.language == Some(language) { None } else { Some(language) };
									})
								})
							/>
						}
					})
					.collect_view()}
			</section>
			<Show when=move || !store.filters.with(|f| f.is_empty())>
				<button class="reset" on:click=move |_| store.reset_filters()>
					"Clear filters"
				</button>
			</Show>
		</div>
	}
}

/// Switch between the globe and the network view.
#[component]
pub fn ViewToggle() -> impl IntoView {
	let store = use_view_store();
	view! {
		<div class="view-toggle">
			{[ViewMode::Globe, ViewMode::Network]
				.into_iter()
				.map(|mode| {
					view! {
						<button
							class:active=move || store.view.get() == mode
							on:click=move |_| store.view.set(mode)
						>
							{mode.label()}
						</button>
					}
				})
				.collect_view()}
		</div>
	}
}

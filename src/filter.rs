//! Narrowing the school set before it reaches the layout engines.

use std::collections::BTreeSet;

use crate::schools::{Language, School, SchoolKind};

/// Active filter selections. An empty selection places no constraint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
	/// Federal states to keep.
	pub regions: BTreeSet<String>,
	/// Broad disciplines to keep.
	pub program_types: BTreeSet<String>,
	/// Institution kinds to keep.
	pub institution_types: BTreeSet<SchoolKind>,
	/// Required teaching language, if any.
	pub language: Option<Language>,
}

impl FilterState {
	/// Whether no filter is active.
	pub fn is_empty(&self) -> bool {
		self.regions.is_empty()
			&& self.program_types.is_empty()
			&& self.institution_types.is_empty()
			&& self.language.is_none()
	}

	/// Whether `school` passes every active filter.
	pub fn matches(&self, school: &School) -> bool {
		let region = self.regions.is_empty() || self.regions.contains(&school.region);
		let program_type = self.program_types.is_empty()
			|| school
				.program_type
				.as_ref()
				.is_some_and(|t| self.program_types.contains(t));
		let kind = self.institution_types.is_empty() || self.institution_types.contains(&school.kind);
		let language = self.language.is_none_or(|l| school.language() == l);
		region && program_type && kind && language
	}

	/// Flip a region in or out of the selection.
	pub fn toggle_region(&mut self, region: &str) {
		if !self.regions.remove(region) {
			self.regions.insert(region.to_string());
		}
	}

	/// Flip an institution kind in or out of the selection.
	pub fn toggle_kind(&mut self, kind: SchoolKind) {
		if !self.institution_types.remove(&kind) {
			self.institution_types.insert(kind);
		}
	}

	/// Flip a discipline in or out of the selection.
	pub fn toggle_program_type(&mut self, program_type: &str) {
		if !self.program_types.remove(program_type) {
			self.program_types.insert(program_type.to_string());
		}
	}

	/// Schools passing the filter, preserving input order.
	pub fn apply(&self, schools: &[School]) -> Vec<School> {
		schools.iter().filter(|s| self.matches(s)).cloned().collect()
	}
}

/// Case-insensitive match of `query` against name, city, region and program names.
/// Whitespace-separated terms must all match somewhere.
pub fn matches_query(school: &School, query: &str) -> bool {
	let haystack = {
		let mut text = school.name.to_lowercase();
		for part in school.city.iter().chain(std::iter::once(&school.region)) {
			text.push(' ');
			text.push_str(&part.to_lowercase());
		}
		for program in &school.programs {
			text.push(' ');
			text.push_str(&program.name.to_lowercase());
		}
		text
	};
	query
		.split_whitespace()
		.all(|term| haystack.contains(&term.to_lowercase()))
}

/// Filter then search, ranking name matches ahead of other matches.
pub fn search<'a>(schools: &'a [School], filters: &FilterState, query: &str) -> Vec<&'a School> {
	let query = query.trim();
	let mut hits: Vec<&School> = schools
		.iter()
		.filter(|s| filters.matches(s))
		.filter(|s| query.is_empty() || matches_query(s, query))
		.collect();
	if !query.is_empty() {
		let needle = query.to_lowercase();
		hits.sort_by_key(|s| !s.name.to_lowercase().contains(&needle));
	}
	hits
}

/// Distinct regions present in `schools`, sorted.
pub fn regions(schools: &[School]) -> Vec<String> {
	schools
		.iter()
		.map(|s| s.region.clone())
		.collect::<BTreeSet<_>>()
		.into_iter()
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schools::{Program, test_school};

	fn dataset() -> Vec<School> {
		let mut a = test_school("1", "Bavaria", SchoolKind::ArtAcademy, 48.1, 11.5);
		a.name = "Akademie München".into();
		a.program_type = Some("Fine Arts".into());
		let mut b = test_school("2", "Berlin", SchoolKind::University, 52.5, 13.3);
		b.name = "Universität der Künste".into();
		b.programs.push(Program {
			name: "Sound Studies".into(),
			degree: None,
			language: Some(Language::English),
		});
		let mut c = test_school("3", "Bavaria", SchoolKind::FilmSchool, 48.1, 11.6);
		c.name = "Filmhochschule".into();
		c.city = Some("München".into());
		vec![a, b, c]
	}

	#[test]
	fn empty_filter_keeps_everything() {
		let schools = dataset();
		let filter = FilterState::default();
		assert!(filter.is_empty());
		assert_eq!(filter.apply(&schools).len(), 3);
	}

	#[test]
	fn selections_combine_with_and() {
		let schools = dataset();
		let mut filter = FilterState::default();
		filter.toggle_region("Bavaria");
		assert_eq!(filter.apply(&schools).len(), 2);
		filter.toggle_kind(SchoolKind::FilmSchool);
		let hits = filter.apply(&schools);
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "3");
		filter.toggle_region("Bavaria");
		assert_eq!(filter.apply(&schools).len(), 1);
	}

	#[test]
	fn program_type_filter_excludes_untyped_schools() {
		let schools = dataset();
		let mut filter = FilterState::default();
		filter.toggle_program_type("Fine Arts");
		let hits = filter.apply(&schools);
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "1");
	}

	#[test]
	fn language_filter_uses_program_languages() {
		let schools = dataset();
		let filter = FilterState {
			language: Some(Language::English),
			..Default::default()
		};
		let hits = filter.apply(&schools);
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "2");
	}

	#[test]
	fn search_matches_city_and_programs() {
		let schools = dataset();
		let filter = FilterState::default();
		let hits = search(&schools, &filter, "münchen");
		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].id, "1");
		assert_eq!(search(&schools, &filter, "sound").len(), 1);
		assert!(search(&schools, &filter, "sound bavaria").is_empty());
	}

	#[test]
	fn regions_are_distinct_and_sorted() {
		assert_eq!(regions(&dataset()), vec!["Bavaria".to_string(), "Berlin".to_string()]);
	}
}

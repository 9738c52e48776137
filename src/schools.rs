//! School records and the JSON loader that validates them.

use std::collections::HashSet;

use log::info;
use serde::{Deserialize, Serialize};

/// Dataset shipped with the app.
pub const BUNDLED_SCHOOLS: &str = include_str!("../data/schools.json");

/// Institution category, used for colors, links and filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolKind {
	/// Full university with art faculties.
	University,
	/// Fachhochschule.
	UniversityOfApplied,
	/// Independent art college.
	Kunsthochschule,
	/// Academy of fine arts.
	ArtAcademy,
	/// Design college.
	DesignSchool,
	/// Music and performing arts college.
	MusicAcademy,
	/// Film and television school.
	FilmSchool,
	/// Privately run institution of any discipline.
	Private,
	#[serde(other)]
	/// Any tag not listed above.
	Other,
}

impl SchoolKind {
	/// Every kind offered as a filter chip.
	pub const ALL: [SchoolKind; 8] = [
		SchoolKind::University,
		SchoolKind::UniversityOfApplied,
		SchoolKind::Kunsthochschule,
		SchoolKind::ArtAcademy,
		SchoolKind::DesignSchool,
		SchoolKind::MusicAcademy,
		SchoolKind::FilmSchool,
		SchoolKind::Private,
	];

	/// Human-readable name.
	pub fn label(self) -> &'static str {
		match self {
			SchoolKind::University => "University",
			SchoolKind::UniversityOfApplied => "University of Applied Sciences",
			SchoolKind::Kunsthochschule => "Kunsthochschule",
			SchoolKind::ArtAcademy => "Art Academy",
			SchoolKind::DesignSchool => "Design School",
			SchoolKind::MusicAcademy => "Music Academy",
			SchoolKind::FilmSchool => "Film School",
			SchoolKind::Private => "Private Institution",
			SchoolKind::Other => "Other",
		}
	}

	/// Base node color as linear RGB in `0..=1`.
	pub fn color(self) -> [f32; 3] {
		match self {
			SchoolKind::University | SchoolKind::UniversityOfApplied => rgb(0x29, 0x79, 0xff),
			SchoolKind::Kunsthochschule | SchoolKind::ArtAcademy => rgb(0x5d, 0x9d, 0xff),
			SchoolKind::DesignSchool => rgb(0x4d, 0x9e, 0xff),
			SchoolKind::MusicAcademy => rgb(0x85, 0xb8, 0xff),
			SchoolKind::FilmSchool => rgb(0x3d, 0x8b, 0xff),
			SchoolKind::Private | SchoolKind::Other => rgb(0x29, 0x79, 0xff),
		}
	}
}

fn rgb(r: u8, g: u8, b: u8) -> [f32; 3] {
	[r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// Language a program is taught in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
	/// Taught in German.
	German,
	/// Taught in English.
	English,
	/// German and English.
	Bilingual,
}

impl Language {
	/// Human-readable name.
	pub fn label(self) -> &'static str {
		match self {
			Language::German => "German only",
			Language::English => "English only",
			Language::Bilingual => "German & English",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// A course of study offered by a school.
pub struct Program {
	/// Program name as published by the school.
	pub name: String,
	#[serde(default)]
	/// Degree awarded, e.g. "Diplom" or "MA".
	pub degree: Option<String>,
	#[serde(default)]
	/// Teaching language, when known.
	pub language: Option<Language>,
}

/// One institution. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct School {
	/// Stable identifier from the dataset.
	pub id: String,
	/// Display name, unique within a dataset.
	pub name: String,
	/// Institution category.
	pub kind: SchoolKind,
	/// Federal state.
	pub region: String,
	#[serde(default)]
	/// Campus city.
	pub city: Option<String>,
	/// Latitude in degrees.
	pub lat: f32,
	/// Longitude in degrees.
	pub lng: f32,
	/// Broad discipline, e.g. "Fine Arts" or "Media Arts".
	#[serde(default)]
	pub program_type: Option<String>,
	#[serde(default)]
	/// Programs offered.
	pub programs: Vec<Program>,
	#[serde(default)]
	/// Founding year.
	pub founded: Option<u16>,
	#[serde(default)]
	/// Enrolled students.
	pub students: Option<u32>,
	#[serde(default)]
	/// Homepage URL.
	pub website: Option<String>,
}

impl School {
	/// Teaching language across all programs. Schools without language data count as German.
	pub fn language(&self) -> Language {
		let mut german = false;
		let mut english = false;
		for program in &self.programs {
			match program.language {
				Some(Language::German) => german = true,
				Some(Language::English) => english = true,
				Some(Language::Bilingual) => return Language::Bilingual,
				None => {}
			}
		}
		match (german, english) {
			(true, true) => Language::Bilingual,
			(false, true) => Language::English,
			_ => Language::German,
		}
	}
}

#[derive(Debug, thiserror::Error)]
/// Why a dataset was rejected.
pub enum DataError {
	#[error("failed to parse school data: {0}")]
	/// The JSON did not match the schema.
	Json(#[from] serde_json::Error),
	#[error("school {id} has an empty name")]
	/// A record has a blank name.
	EmptyName { id: String },
	#[error("school {name} has invalid coordinates ({lat}, {lng})")]
	/// Non-finite or out of range.
	InvalidCoordinate { name: String, lat: f32, lng: f32 },
	#[error("duplicate school name: {0}")]
	/// Two records share a name, which node ids rely on.
	DuplicateName(String),
}

/// Parse and validate a JSON array of schools.
pub fn load_schools(json: &str) -> Result<Vec<School>, DataError> {
	let schools: Vec<School> = serde_json::from_str(json)?;
	let mut names = HashSet::new();

	for school in &schools {
		if school.name.trim().is_empty() {
			return Err(DataError::EmptyName {
				id: school.id.clone(),
			});
		}
		let lat_ok = school.lat.is_finite() && (-90.0..=90.0).contains(&school.lat);
		let lng_ok = school.lng.is_finite() && (-180.0..=180.0).contains(&school.lng);
		if !lat_ok || !lng_ok {
			return Err(DataError::InvalidCoordinate {
				name: school.name.clone(),
				lat: school.lat,
				lng: school.lng,
			});
		}
		if !names.insert(school.name.as_str()) {
			return Err(DataError::DuplicateName(school.name.clone()));
		}
	}

	info!("Loaded {} schools", schools.len());
	Ok(schools)
}

#[cfg(test)]
pub(crate) fn test_school(id: &str, region: &str, kind: SchoolKind, lat: f32, lng: f32) -> School {
	School {
		id: id.to_string(),
		name: format!("School {id}"),
		kind,
		region: region.to_string(),
		city: None,
		lat,
		lng,
		program_type: None,
		programs: Vec::new(),
		founded: None,
		students: None,
		website: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bundled_dataset_is_valid() {
		let schools = load_schools(BUNDLED_SCHOOLS).unwrap();
		assert!(schools.len() >= 10);
		assert!(schools.iter().all(|s| s.lat > 47.0 && s.lat < 55.5));
	}

	#[test]
	fn rejects_out_of_range_latitude() {
		let json = r#"[{"id":"1","name":"A","kind":"university","region":"Bavaria","lat":123.0,"lng":11.0}]"#;
		assert!(matches!(
			load_schools(json),
			Err(DataError::InvalidCoordinate { .. })
		));
	}

	#[test]
	fn rejects_duplicate_names() {
		let json = r#"[
			{"id":"1","name":"A","kind":"university","region":"Bavaria","lat":48.1,"lng":11.5},
			{"id":"2","name":"A","kind":"film_school","region":"Berlin","lat":52.5,"lng":13.4}
		]"#;
		assert!(matches!(load_schools(json), Err(DataError::DuplicateName(n)) if n == "A"));
	}

	#[test]
	fn unknown_kind_falls_back_to_other() {
		let json = r#"[{"id":"1","name":"A","kind":"conservatory","region":"Saxony","lat":51.0,"lng":13.7}]"#;
		let schools = load_schools(json).unwrap();
		assert_eq!(schools[0].kind, SchoolKind::Other);
	}

	#[test]
	fn malformed_json_is_a_parse_error() {
		assert!(matches!(load_schools("[{"), Err(DataError::Json(_))));
	}

	#[test]
	fn language_is_derived_from_programs() {
		let mut school = test_school("1", "Berlin", SchoolKind::University, 52.5, 13.4);
		assert_eq!(school.language(), Language::German);
		school.programs.push(Program {
			name: "Fine Arts".into(),
			degree: None,
			language: Some(Language::English),
		});
		assert_eq!(school.language(), Language::English);
		school.programs.push(Program {
			name: "Sculpture".into(),
			degree: None,
			language: Some(Language::German),
		});
		assert_eq!(school.language(), Language::Bilingual);
	}
}

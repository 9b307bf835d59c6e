//! # Star and target catalogs
//!
//! Read-only lookup services for the sky map and the astrophotography planner:
//!
//! - [`StarCatalog`]: stars (J2000) queried by magnitude, name, id or cone, plus the
//!   constellation stick figures drawn between them. [`InMemoryCatalog`] implements it
//!   from CSV files; a small bright-star catalog is built in.
//! - [`TargetCatalog`]: named deep-sky imaging targets (Messier objects) and the
//!   planets, looked up case-insensitively by id or name.
//!
//! ## CSV formats
//!
//! ```text
//! stars:               id,name,ra_deg,dec_deg,magnitude,parallax_mas
//! constellation lines: constellation,from_id,to_id
//! deep-sky targets:    id,name,object_type,ra,dec,magnitude   (ra/dec sexagesimal)
//! ```
//!
//! Empty `name` and `parallax_mas` fields are allowed. Distances are derived from the
//! parallax as `1000 / parallax_mas` parsecs.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::Degree;
use crate::conversion::{parse_dec, parse_ra};
use crate::coordinates::{angular_separation, EquatorialPosition};
use crate::ephemeris::Body;
use crate::skyplan_errors::SkyPlanError;

const BUILTIN_STARS: &str = include_str!("../data/bright_stars.csv");
const BUILTIN_LINES: &str = include_str!("../data/constellation_lines.csv");
const BUILTIN_TARGETS: &str = include_str!("../data/deep_sky.csv");

/// A catalog star, J2000 coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialObject {
    pub id: String,
    pub name: Option<String>,
    pub ra_deg: Degree,
    pub dec_deg: Degree,
    pub magnitude: f64,
    pub distance_pc: Option<f64>,
}

impl CelestialObject {
    pub fn position(&self) -> EquatorialPosition {
        EquatorialPosition::j2000(self.ra_deg, self.dec_deg)
    }
}

/// A constellation stick-figure segment between two star ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstellationLine {
    pub constellation: String,
    pub from_id: String,
    pub to_id: String,
}

#[derive(Debug, Deserialize)]
struct StarRecord {
    id: String,
    name: Option<String>,
    ra_deg: f64,
    dec_deg: f64,
    magnitude: f64,
    parallax_mas: Option<f64>,
}

impl TryFrom<StarRecord> for CelestialObject {
    type Error = SkyPlanError;

    fn try_from(record: StarRecord) -> Result<Self, Self::Error> {
        EquatorialPosition::j2000(record.ra_deg, record.dec_deg).validate()?;
        if !record.magnitude.is_finite() {
            return Err(SkyPlanError::InvalidInput(format!(
                "star {} has no valid magnitude",
                record.id
            )));
        }

        Ok(CelestialObject {
            distance_pc: record
                .parallax_mas
                .filter(|p| *p > 0.0)
                .map(|p| 1000.0 / p),
            name: record.name.filter(|n| !n.trim().is_empty()),
            id: record.id,
            ra_deg: record.ra_deg,
            dec_deg: record.dec_deg,
            magnitude: record.magnitude,
        })
    }
}

/// Read-only star lookup service.
pub trait StarCatalog: Send + Sync {
    /// Stars with `magnitude ≤ max_magnitude`, brightest first.
    fn stars_brighter_than(&self, max_magnitude: f64) -> Vec<&CelestialObject>;

    /// Star by exact id.
    fn find_by_id(&self, id: &str) -> Option<&CelestialObject>;

    /// Star by common name, case-insensitive.
    fn find_by_name(&self, name: &str) -> Option<&CelestialObject>;

    /// Stars within `radius_deg` of a J2000 position, nearest first.
    fn cone_search(&self, center: &EquatorialPosition, radius_deg: Degree) -> Vec<&CelestialObject>;

    /// Constellation stick figures.
    fn constellation_lines(&self) -> &[ConstellationLine];
}

/// CSV-backed catalog held in memory, sorted by magnitude.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    stars: Vec<CelestialObject>,
    by_id: HashMap<String, usize>,
    lines: Vec<ConstellationLine>,
}

impl InMemoryCatalog {
    /// Build a catalog from stars and lines. Lines naming unknown stars are dropped.
    pub fn new(mut stars: Vec<CelestialObject>, lines: Vec<ConstellationLine>) -> Self {
        stars.sort_by(|a, b| a.magnitude.total_cmp(&b.magnitude));
        let by_id: HashMap<String, usize> = stars
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let (lines, dangling): (Vec<_>, Vec<_>) = lines
            .into_iter()
            .partition(|l| by_id.contains_key(&l.from_id) && by_id.contains_key(&l.to_id));
        if !dangling.is_empty() {
            log::warn!(
                "dropping {} constellation segments with unknown stars",
                dangling.len()
            );
        }

        InMemoryCatalog {
            stars,
            by_id,
            lines,
        }
    }

    /// The bright-star catalog shipped with the crate.
    pub fn builtin() -> Result<Self, SkyPlanError> {
        let stars = read_stars(BUILTIN_STARS.as_bytes())?;
        let lines = read_constellation_lines(BUILTIN_LINES.as_bytes())?;
        Ok(InMemoryCatalog::new(stars, lines))
    }

    /// Load stars and, optionally, constellation lines from CSV files.
    pub fn from_csv_files(
        stars_path: &Utf8Path,
        lines_path: Option<&Utf8Path>,
    ) -> Result<Self, SkyPlanError> {
        let stars = read_stars(File::open(stars_path)?)?;
        let lines = match lines_path {
            Some(path) => read_constellation_lines(File::open(path)?)?,
            None => Vec::new(),
        };
        log::info!(
            "loaded {} stars and {} constellation segments from {stars_path}",
            stars.len(),
            lines.len()
        );
        Ok(InMemoryCatalog::new(stars, lines))
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

impl StarCatalog for InMemoryCatalog {
    fn stars_brighter_than(&self, max_magnitude: f64) -> Vec<&CelestialObject> {
        self.stars
            .iter()
            .take_while(|s| s.magnitude <= max_magnitude)
            .collect()
    }

    fn find_by_id(&self, id: &str) -> Option<&CelestialObject> {
        self.by_id.get(id).map(|&i| &self.stars[i])
    }

    fn find_by_name(&self, name: &str) -> Option<&CelestialObject> {
        let wanted = name.trim();
        self.stars.iter().find(|s| {
            s.name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(wanted))
        })
    }

    fn cone_search(&self, center: &EquatorialPosition, radius_deg: Degree) -> Vec<&CelestialObject> {
        self.stars
            .iter()
            .map(|s| (angular_separation(center, &s.position()), s))
            .filter(|(sep, _)| *sep <= radius_deg)
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, s)| s)
            .collect()
    }

    fn constellation_lines(&self) -> &[ConstellationLine] {
        &self.lines
    }
}

/// Parse a star CSV (`id,name,ra_deg,dec_deg,magnitude,parallax_mas`).
pub fn read_stars<R: Read>(reader: R) -> Result<Vec<CelestialObject>, SkyPlanError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize::<StarRecord>()
        .map(|record| CelestialObject::try_from(record?))
        .collect()
}

/// Parse a constellation line CSV (`constellation,from_id,to_id`).
pub fn read_constellation_lines<R: Read>(reader: R) -> Result<Vec<ConstellationLine>, SkyPlanError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    Ok(csv_reader
        .deserialize::<ConstellationLine>()
        .collect::<Result<Vec<_>, _>>()?)
}

// -------------------------------------------------------------------------------------------------
// Imaging targets
// -------------------------------------------------------------------------------------------------

/// A named deep-sky object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepSkyObject {
    pub id: String,
    pub name: String,
    pub object_type: String,
    pub ra_deg: Degree,
    pub dec_deg: Degree,
    pub magnitude: f64,
}

#[derive(Debug, Deserialize)]
struct DeepSkyRecord {
    id: String,
    name: String,
    object_type: String,
    ra: String,
    dec: String,
    magnitude: f64,
}

/// What the astrophotography planner points at.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Fixed J2000 coordinates: deep-sky objects, stars or user-supplied RA/Dec.
    Fixed {
        id: String,
        name: String,
        position: EquatorialPosition,
    },
    /// A planet, whose position changes through the night.
    Planet(Body),
}

impl Target {
    /// Fixed target at arbitrary J2000 coordinates.
    pub fn coordinates(ra_deg: Degree, dec_deg: Degree) -> Result<Target, SkyPlanError> {
        let position = EquatorialPosition::j2000(ra_deg, dec_deg);
        position.validate()?;
        Ok(Target::Fixed {
            id: format!("{ra_deg:.4},{dec_deg:+.4}"),
            name: format!("RA {ra_deg:.4}° Dec {dec_deg:+.4}°"),
            position,
        })
    }

    pub fn id(&self) -> String {
        match self {
            Target::Fixed { id, .. } => id.clone(),
            Target::Planet(body) => body.name().to_lowercase(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Target::Fixed { name, .. } => name,
            Target::Planet(body) => body.name(),
        }
    }
}

impl From<&DeepSkyObject> for Target {
    fn from(obj: &DeepSkyObject) -> Self {
        Target::Fixed {
            id: obj.id.clone(),
            name: obj.name.clone(),
            position: EquatorialPosition::j2000(obj.ra_deg, obj.dec_deg),
        }
    }
}

impl From<&CelestialObject> for Target {
    fn from(star: &CelestialObject) -> Self {
        Target::Fixed {
            id: star.id.clone(),
            name: star.name.clone().unwrap_or_else(|| star.id.clone()),
            position: star.position(),
        }
    }
}

/// Deep-sky imaging targets plus the planets.
#[derive(Debug, Clone, Default)]
pub struct TargetCatalog {
    objects: Vec<DeepSkyObject>,
}

impl TargetCatalog {
    /// The built-in Messier selection.
    pub fn builtin() -> Result<Self, SkyPlanError> {
        Self::from_reader(BUILTIN_TARGETS.as_bytes())
    }

    /// Parse a deep-sky CSV (`id,name,object_type,ra,dec,magnitude`).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SkyPlanError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let objects = csv_reader
            .deserialize::<DeepSkyRecord>()
            .map(|record| {
                let record = record?;
                Ok(DeepSkyObject {
                    ra_deg: parse_ra(&record.ra)?,
                    dec_deg: parse_dec(&record.dec)?,
                    id: record.id,
                    name: record.name,
                    object_type: record.object_type,
                    magnitude: record.magnitude,
                })
            })
            .collect::<Result<Vec<_>, SkyPlanError>>()?;
        Ok(TargetCatalog { objects })
    }

    pub fn objects(&self) -> &[DeepSkyObject] {
        &self.objects
    }

    /// Resolve a target by deep-sky id or name, then by planet name (case-insensitive).
    ///
    /// Errors
    /// ------
    /// * [`SkyPlanError::TargetNotFound`] when nothing matches.
    pub fn find(&self, query: &str) -> Result<Target, SkyPlanError> {
        let wanted = query.trim();
        if let Some(obj) = self
            .objects
            .iter()
            .find(|o| o.id.eq_ignore_ascii_case(wanted) || o.name.eq_ignore_ascii_case(wanted))
        {
            return Ok(Target::from(obj));
        }

        match wanted.parse::<Body>() {
            Ok(body) if body.is_planet() => Ok(Target::Planet(body)),
            _ => Err(SkyPlanError::TargetNotFound(query.to_string())),
        }
    }

    /// `(id, name, type)` of every available target, planets last.
    pub fn available_targets(&self) -> Vec<(String, String, String)> {
        self.objects
            .iter()
            .map(|o| (o.id.clone(), o.name.clone(), o.object_type.clone()))
            .chain(Body::PLANETS.iter().map(|b| {
                (
                    b.name().to_lowercase(),
                    b.name().to_string(),
                    "Planet".to_string(),
                )
            }))
            .collect()
    }
}

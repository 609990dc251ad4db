use std::path::{Path, PathBuf};

use geo_types::Coord;

use crate::{
    error::{Error, Result},
    logln,
    util::geo::Coordinate,
};

/// Where the sparse route comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteSource {
    File(PathBuf),
    Bundled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRoute {
    pub origin: String,
    pub coordinates: Vec<Coordinate>,
    // (1-based line number, raw line)
    pub skipped: Vec<(usize, String)>,
}

pub struct RouteLoader;

impl RouteLoader {
    const CC: &'static str = "RouteLoader";

    const BUNDLED_ROUTE: &'static str = include_str!("../../routes/default.txt");

    /// User override first, then a configured default file, then the bundled route.
    pub fn select(user_override: Option<&Path>, default: Option<&Path>) -> RouteSource {
        if let Some(path) = user_override {
            if path.exists() {
                return RouteSource::File(path.to_path_buf());
            }

            logln!("Route override {} missing, falling back", path.display());
        }

        match default {
            Some(path) => RouteSource::File(path.to_path_buf()),
            None => RouteSource::Bundled,
        }
    }

    pub fn load(source: &RouteSource) -> Result<ParsedRoute> {
        match source {
            RouteSource::File(path) => RouteLoader::load_file(path),
            RouteSource::Bundled => RouteLoader::parse(RouteLoader::BUNDLED_ROUTE, "bundled default route"),
        }
    }

    pub fn load_file(path: &Path) -> Result<ParsedRoute> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => {
                Error::InvalidRouteFile(format!("{} is not valid UTF-8 text", path.display()))
            }
            _ => Error::RouteFileNotFound(format!("{}: {e}", path.display())),
        })?;

        RouteLoader::parse(&content, &path.display().to_string())
    }

    /// Parses `<lon>,<lat>` lines. Malformed lines are skipped and reported.
    pub fn parse(content: &str, origin: &str) -> Result<ParsedRoute> {
        let mut coordinates = Vec::new();
        let mut skipped = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            match RouteLoader::parse_line(line) {
                Some(coord) => coordinates.push(coord),
                None => skipped.push((index + 1, line.to_string())),
            }
        }

        if coordinates.is_empty() {
            return Err(Error::EmptyRoute(format!(
                "{origin} contains no usable coordinates"
            )));
        }

        Ok(ParsedRoute {
            origin: origin.to_string(),
            coordinates,
            skipped,
        })
    }

    fn parse_line(line: &str) -> Option<Coordinate> {
        let (lon, lat) = line.split_once(',')?;
        let lon: f64 = lon.trim().parse().ok()?;
        let lat: f64 = lat.trim().parse().ok()?;

        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }

        Some(Coord { x: lon, y: lat })
    }
}

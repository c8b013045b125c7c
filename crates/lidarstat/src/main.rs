use anyhow::{bail, Context, Result};
use clap::Parser;
use lidarbin::Point3;
use log::{info, warn};
use rayon::prelude::*;
use std::path::PathBuf;
use walkdir::WalkDir;

/// `lidarstat` - inspect planar LiDAR point-cloud binaries.
///
/// Decodes each input asset, reports its point count (and optionally its
/// per-axis extents), and keeps a running total across all inputs - the
/// same bookkeeping the visualization front end performs when it loads a
/// set of assets, minus the rendering.
#[derive(Parser, Debug)]
#[command(name = "lidarstat", version)]
struct Args {
    /// Explicit .bin files to inspect. When empty, --input-dir is scanned.
    files: Vec<PathBuf>,

    /// Directory to scan recursively for *.bin assets.
    #[arg(long, default_value = "assets")]
    input_dir: PathBuf,

    /// Also report per-axis min/max extents for each asset.
    #[arg(long, default_value_t = false)]
    extents: bool,
}

/// Point count plus per-axis bounds for one or more decoded clouds.
///
/// Merging is associative with `EMPTY` as identity, so per-file summaries
/// can be folded in any order into one grand total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CloudSummary {
    points: u64,
    min: [i16; 3],
    max: [i16; 3],
}

impl CloudSummary {
    const EMPTY: Self = Self {
        points: 0,
        min: [i16::MAX; 3],
        max: [i16::MIN; 3],
    };

    fn of(points: &[Point3]) -> Self {
        points.iter().fold(Self::EMPTY, |mut acc, p| {
            let c = [p.x, p.y, p.z];

            for axis in 0..3 {
                acc.min[axis] = acc.min[axis].min(c[axis]);
                acc.max[axis] = acc.max[axis].max(c[axis]);
            }

            acc.points += 1;
            acc
        })
    }

    fn merge(self, other: Self) -> Self {
        let mut out = self;

        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(other.min[axis]);
            out.max[axis] = out.max[axis].max(other.max[axis]);
        }

        out.points += other.points;
        out
    }

    fn extents_line(&self) -> String {
        if self.points == 0 {
            return "empty".to_string();
        }

        format!(
            "x [{}, {}], y [{}, {}], z [{}, {}]",
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2]
        )
    }
}

fn collect_inputs(args: &Args) -> Result<Vec<PathBuf>> {
    if !args.files.is_empty() {
        return Ok(args.files.clone());
    }

    let mut found = Vec::new();

    for entry in WalkDir::new(&args.input_dir) {
        let entry = entry
            .with_context(|| format!("scanning {}", args.input_dir.display()))?;

        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |e| e == "bin")
        {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let inputs = collect_inputs(&args)?;
    if inputs.is_empty() {
        bail!("no .bin assets found (looked in {})", args.input_dir.display());
    }

    // Decode in parallel; each file is independent.
    let results: Vec<(PathBuf, Result<CloudSummary>)> = inputs
        .par_iter()
        .map(|path| {
            let summary = lidarbin::read_file(path)
                .map(|points| CloudSummary::of(&points))
                .with_context(|| format!("decoding {}", path.display()));
            (path.clone(), summary)
        })
        .collect();

    let mut total = CloudSummary::EMPTY;
    let mut failures = 0usize;

    for (path, result) in &results {
        match result {
            Ok(summary) => {
                if args.extents {
                    info!(
                        "{}: {} points, {}",
                        path.display(),
                        summary.points,
                        summary.extents_line()
                    );
                } else {
                    info!("{}: {} points", path.display(), summary.points);
                }

                total = total.merge(*summary);
            }
            Err(err) => {
                warn!("{}: {:#}", path.display(), err);
                failures += 1;
            }
        }
    }

    info!(
        "total: {} points across {} asset(s)",
        total.points,
        results.len() - failures
    );

    if failures > 0 {
        bail!("{failures} of {} asset(s) failed to decode", results.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_tracks_count_and_bounds() {
        let points = [
            Point3 { x: 10, y: 0, z: 1000 },
            Point3 { x: -10, y: 100, z: 0 },
        ];

        let summary = CloudSummary::of(&points);

        assert_eq!(summary.points, 2);
        assert_eq!(summary.min, [-10, 0, 0]);
        assert_eq!(summary.max, [10, 100, 1000]);
    }

    #[test]
    fn merge_is_associative_with_empty_identity() {
        let a = CloudSummary::of(&[Point3 { x: 1, y: 2, z: 3 }]);
        let b = CloudSummary::of(&[Point3 { x: -5, y: 9, z: 0 }]);
        let c = CloudSummary::of(&[Point3 { x: 0, y: -40, z: 7 }]);

        assert_eq!(a.merge(CloudSummary::EMPTY), a);
        assert_eq!(CloudSummary::EMPTY.merge(a), a);
        assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
    }

    #[test]
    fn empty_summary_reports_no_extents() {
        assert_eq!(CloudSummary::of(&[]).points, 0);
        assert_eq!(CloudSummary::of(&[]).extents_line(), "empty");
    }
}

//! Plain-text YODA files, `Scatter2D` objects only.
//!
//! ```text
//! # BEGIN YODA_SCATTER2D_V2 /ATLAS_2014_I1/d01-x01-y01
//! Path: /ATLAS_2014_I1/d01-x01-y01
//! Type: Scatter2D
//! a: 0.5
//! ---
//! # xval   xerr-   xerr+   yval   yerr-   yerr+
//! 1.5  0.5  0.5  12.0  1.0  1.0
//! # END YODA_SCATTER2D_V2
//! ```
//!
//! YODA 1 headers (`# BEGIN YODA_SCATTER2D`) write annotations as `key=value`;
//! both separators are accepted. Other object types are skipped. `Path` and
//! `Type` are structural and are not kept as annotations.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::domain::{Point2D, Scatter2D};
use crate::error::AppError;

const SCATTER_TAGS: [&str; 2] = ["YODA_SCATTER2D", "YODA_SCATTER2D_V2"];

enum State {
    Outside,
    Skipping,
    Header(Scatter2D),
    Body(Scatter2D),
}

fn begin_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start_matches('#').trim_start().strip_prefix("BEGIN ")?;
    let mut parts = rest.split_whitespace();
    let tag = parts.next()?;
    Some((tag, parts.next().unwrap_or("")))
}

fn is_end_line(line: &str) -> bool {
    line.trim_start_matches('#').trim_start().starts_with("END ")
}

fn parse_row(line: &str, source: &str, lineno: usize) -> Result<Point2D, AppError> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::config(format!("{source}:{lineno}: invalid number ({e}).")))?;
    let [x, xm, xp, y, ym, yp] = values[..] else {
        return Err(AppError::config(format!(
            "{source}:{lineno}: expected 6 columns, found {}.",
            values.len()
        )));
    };
    Ok(Point2D {
        x,
        y,
        xerr: (xm, xp),
        yerr: (ym, yp),
    })
}

/// Data rows are all floats, `nan` and `inf` included.
fn looks_numeric(line: &str) -> bool {
    line.split_whitespace().all(|t| t.parse::<f64>().is_ok())
}

/// Split an annotation on whichever of `:` (V2) or `=` (V1) comes first.
fn split_annotation(line: &str) -> Option<(&str, &str)> {
    let at = line.find([':', '='])?;
    Some((line[..at].trim(), line[at + 1..].trim()))
}

/// Parse every `Scatter2D` in `text`. `source` only labels error messages.
pub fn parse_yoda(text: &str, source: &str) -> Result<Vec<Scatter2D>, AppError> {
    let mut out = Vec::new();
    let mut state = State::Outside;

    for (i, raw) in text.lines().enumerate() {
        let lineno = i + 1;
        let line = raw.trim();
        state = match state {
            State::Outside => match begin_line(line) {
                Some((tag, path)) if SCATTER_TAGS.contains(&tag) => {
                    State::Header(Scatter2D::new(path))
                }
                Some((tag, path)) => {
                    debug!(source, tag, path, "Skipping non-scatter YODA object.");
                    State::Skipping
                }
                None => State::Outside,
            },
            State::Skipping if is_end_line(line) => State::Outside,
            State::Skipping => State::Skipping,
            State::Header(s) | State::Body(s) if is_end_line(line) => {
                out.push(s);
                State::Outside
            }
            State::Header(s) if line == "---" => State::Body(s),
            State::Header(mut s) if !line.is_empty() && !line.starts_with('#') => {
                if looks_numeric(line) {
                    s.points.push(parse_row(line, source, lineno)?);
                    State::Body(s)
                } else {
                    let Some((key, value)) = split_annotation(line) else {
                        return Err(AppError::config(format!(
                            "{source}:{lineno}: expected 'key: value' annotation, got '{line}'."
                        )));
                    };
                    if key != "Path" && key != "Type" {
                        s.set_annotation(key, value);
                    }
                    State::Header(s)
                }
            }
            State::Body(mut s) if !line.is_empty() && !line.starts_with('#') => {
                s.points.push(parse_row(line, source, lineno)?);
                State::Body(s)
            }
            other => other,
        };
    }

    if !matches!(state, State::Outside) {
        return Err(AppError::config(format!(
            "{source}: unterminated YODA object at end of file."
        )));
    }
    Ok(out)
}

pub fn read_yoda(path: &Path) -> Result<Vec<Scatter2D>, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read YODA file '{}': {e}", path.display())))?;
    parse_yoda(&text, &path.display().to_string())
}

pub fn format_yoda(scatters: &[Scatter2D]) -> String {
    let mut s = String::new();
    for sc in scatters {
        s.push_str(&format!("# BEGIN YODA_SCATTER2D_V2 {}\n", sc.path));
        s.push_str(&format!("Path: {}\nType: Scatter2D\n", sc.path));
        for (k, v) in &sc.annotations {
            s.push_str(&format!("{k}: {v}\n"));
        }
        s.push_str("---\n");
        s.push_str("# xval\t xerr-\t xerr+\t yval\t yerr-\t yerr+\n");
        for p in &sc.points {
            s.push_str(&format!(
                "{:e}\t{:e}\t{:e}\t{:e}\t{:e}\t{:e}\n",
                p.x, p.xerr.0, p.xerr.1, p.y, p.yerr.0, p.yerr.1
            ));
        }
        s.push_str("# END YODA_SCATTER2D_V2\n\n");
    }
    s
}

pub fn write_yoda(path: &Path, scatters: &[Scatter2D]) -> Result<(), AppError> {
    fs::write(path, format_yoda(scatters))
        .map_err(|e| AppError::io(format!("Failed to write YODA file '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# BEGIN YODA_HISTO1D_V2 /RAW/ignored
Path: /RAW/ignored
1 2 3
# END YODA_HISTO1D_V2

# BEGIN YODA_SCATTER2D_V2 /ATLAS/d01-x01-y01
Path: /ATLAS/d01-x01-y01
Type: Scatter2D
a: 0.25
b: 3
---
# xval\t xerr-\t xerr+\t yval\t yerr-\t yerr+
1.5\t0.5\t0.5\t12.0\t1.0\t3.0
2.5\t0.5\t0.5\t8.0\t0.5\t0.5
# END YODA_SCATTER2D_V2
";

    #[test]
    fn parses_scatter_and_skips_other_objects() {
        let objs = parse_yoda(SAMPLE, "sample").unwrap();
        assert_eq!(objs.len(), 1);
        let s = &objs[0];
        assert_eq!(s.path, "/ATLAS/d01-x01-y01");
        assert_eq!(s.annotation("a"), Some("0.25"));
        assert_eq!(s.annotation("Path"), None);
        assert_eq!(s.points.len(), 2);

        let h = s.to_histogram();
        assert_eq!(h.x, vec![1.5, 2.5]);
        assert_eq!(h.yerr, vec![2.0, 0.5]);
    }

    #[test]
    fn scatter_without_separator_is_accepted() {
        let text = "BEGIN YODA_SCATTER2D /h\nk: v\n0 0.5 0.5 1 0.1 0.1\nEND YODA_SCATTER2D\n";
        let objs = parse_yoda(text, "t").unwrap();
        assert_eq!(objs[0].annotation("k"), Some("v"));
        assert_eq!(objs[0].points[0].y, 1.0);
    }

    #[test]
    fn yoda1_headers_use_equals_separator() {
        let text = "\
# BEGIN YODA_SCATTER2D /A/x
Path=/A/x
Type=Scatter2D
Title=$p_T: leading$
a=0.5
# xval\t xerr-\t xerr+\t yval\t yerr-\t yerr+
1.5\t0.5\t0.5\t12.0\t1.0\t1.0
# END YODA_SCATTER2D
";
        let objs = parse_yoda(text, "v1").unwrap();
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0].path, "/A/x");
        assert_eq!(objs[0].annotation("a"), Some("0.5"));
        assert_eq!(objs[0].annotation("Title"), Some("$p_T: leading$"));
        assert_eq!(objs[0].annotation("Type"), None);
        assert_eq!(objs[0].points.len(), 1);
    }

    #[test]
    fn undefined_bins_are_rows_not_annotations() {
        let text = "\
# BEGIN YODA_SCATTER2D_V2 /A/x
Path: /A/x
nan\t0.5\t0.5\t12.0\t1.0\t1.0
2.5\t0.5\t0.5\tinf\t1.0\t1.0
# END YODA_SCATTER2D_V2
";
        let objs = parse_yoda(text, "nan").unwrap();
        let pts = &objs[0].points;
        assert_eq!(pts.len(), 2);
        assert!(pts[0].x.is_nan());
        assert_eq!(pts[0].y, 12.0);
        assert!(pts[1].y.is_infinite());
    }

    #[test]
    fn malformed_rows_name_the_line() {
        let text = "# BEGIN YODA_SCATTER2D /h\n---\n1 2 3\n# END YODA_SCATTER2D\n";
        let err = parse_yoda(text, "bad.yoda").unwrap_err();
        assert!(err.message().contains("bad.yoda:3"));

        let open = "# BEGIN YODA_SCATTER2D /h\n---\n";
        assert!(parse_yoda(open, "open.yoda").is_err());
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_model.yoda");
        let mut s = Scatter2D::new("/A/x");
        s.set_annotation("a", 0.1);
        s.add_point(1.5, 12.25, (0.5, 0.5));
        write_yoda(&path, std::slice::from_ref(&s)).unwrap();

        let back = read_yoda(&path).unwrap();
        assert_eq!(back, vec![s]);
    }
}

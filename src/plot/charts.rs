//! The report figures.

use std::ops::Range;
use std::path::Path;

use nalgebra::DMatrix;
use plotters::chart::ChartContext;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::combinators::IntoLogRange;
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::domain::TracePoint;
use crate::error::AppError;
use crate::fit::ParameterProfile;
use crate::models::{ErrorBand, ModelDiagnostics, ParamLossScatter};
use crate::plot::svg::{
    DrawResult, FIGURE_SIZE, diverging_color, draw_svg, finite_points, log_range, padded_range,
};
use crate::report::benchmark::BenchmarkScatter;
use crate::report::compare::ObservableComparison;

const CAPTION_FONT: (&str, u32) = ("sans-serif", 20);

/// Best objective value against the number of evaluations.
pub fn minimizer_trace(path: &Path, trace: &[TracePoint]) -> Result<(), AppError> {
    let points = finite_points(
        "minimizer trace",
        trace.iter().map(|t| (t.evaluations as f64, t.fbest)),
    );
    let xr = padded_range(points.iter().map(|p| p.0));
    let yr = padded_range(points.iter().map(|p| p.1));

    draw_svg(path, FIGURE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Minimizer convergence", CAPTION_FONT)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xr, yr)?;
        chart
            .configure_mesh()
            .x_desc("function evaluations")
            .y_desc("best chi2/dof")
            .draw()?;
        chart.draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))?;
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;
        Ok(())
    })
}

/// Reference lines and curves of a parameter profile, on a linear or log y-axis.
fn profile_series<'a, Y>(
    mut chart: ChartContext<'a, SVGBackend<'a>, Cartesian2d<RangedCoordf64, Y>>,
    profile: &ParameterProfile,
    main: &[(f64, f64)],
    unweighted: Option<&[(f64, f64)]>,
    yr: Range<f64>,
) -> DrawResult
where
    Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    chart
        .configure_mesh()
        .x_desc(profile.name.as_str())
        .y_desc("chi2/dof")
        .draw()?;

    let main_label = if unweighted.is_some() {
        "parameter variation, weighted chi2/dof"
    } else {
        "parameter variation"
    };
    chart
        .draw_series(LineSeries::new(main.iter().copied(), BLUE.stroke_width(2)))?
        .label(main_label)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    if let Some(u) = unweighted {
        chart
            .draw_series(LineSeries::new(u.iter().copied(), GREEN.stroke_width(2)))?
            .label("parameter variation, chi2/dof")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));
    }

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(profile.best, yr.start), (profile.best, yr.end)],
            RED.stroke_width(2),
        )))?
        .label("best value")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    let sigma_style = RED.mix(0.5).stroke_width(1);
    chart
        .draw_series(
            [profile.best - profile.sigma, profile.best + profile.sigma]
                .into_iter()
                .map(|x| PathElement::new(vec![(x, yr.start), (x, yr.end)], sigma_style)),
        )?
        .label("1-sigma")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], sigma_style));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// One-dimensional profile with the best value and its 1-sigma band.
///
/// The y-axis is logarithmic unless some plotted value is not positive.
pub fn parameter_profile(path: &Path, profile: &ParameterProfile) -> Result<(), AppError> {
    let main = finite_points("profile", profile.x.iter().copied().zip(profile.chi2.iter().copied()));
    let unweighted = profile.unweighted.as_ref().map(|u| {
        finite_points("unweighted profile", profile.x.iter().copied().zip(u.iter().copied()))
    });

    let lines = [profile.best - profile.sigma, profile.best, profile.best + profile.sigma];
    let xr = padded_range(main.iter().map(|p| p.0).chain(lines));
    let ys = || main.iter().chain(unweighted.iter().flatten()).map(|p| p.1);

    draw_svg(path, FIGURE_SIZE, |root| {
        let mut builder = ChartBuilder::on(root);
        builder
            .caption(
                format!("1D profile for parameter {} - {}", profile.dim, profile.name),
                CAPTION_FONT,
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60);
        let unweighted = unweighted.as_deref();
        match log_range(ys()) {
            Some(yr) => {
                let chart = builder.build_cartesian_2d(xr, yr.clone().log_scale())?;
                profile_series(chart, profile, &main, unweighted, yr)
            }
            None => {
                let yr = padded_range(ys());
                let chart = builder.build_cartesian_2d(xr, yr.clone())?;
                profile_series(chart, profile, &main, unweighted, yr)
            }
        }
    })
}

/// Final training loss per bin with its mean and spread.
pub fn model_loss(path: &Path, diag: &ModelDiagnostics) -> Result<(), AppError> {
    let points = finite_points(
        "bin loss",
        diag.bin_loss.iter().enumerate().map(|(i, &l)| (i as f64, l)),
    );
    let levels = [
        diag.avg_loss - diag.std_loss,
        diag.avg_loss,
        diag.avg_loss + diag.std_loss,
    ];
    let xr = padded_range(points.iter().map(|p| p.0));
    let yr = padded_range(points.iter().map(|p| p.1).chain(levels));

    draw_svg(path, FIGURE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Loss function for final model (bin-by-bin)", CAPTION_FONT)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xr.clone(), yr)?;
        chart.configure_mesh().x_desc("bin").y_desc("MSE").draw()?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLACK))?
            .label("avg. per bin")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
        if levels.iter().all(|v| v.is_finite()) {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(xr.start, levels[1]), (xr.end, levels[1])],
                    RED.stroke_width(2),
                )))?
                .label("total")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
            let spread = RED.mix(0.5).stroke_width(1);
            chart
                .draw_series([levels[0], levels[2]].into_iter().map(|v| {
                    PathElement::new(vec![(xr.start, v), (xr.end, v)], spread)
                }))?
                .label("std. dev.")
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], spread));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Per-run, per-bin loss against one parameter.
pub fn loss_vs_param(path: &Path, scatter: &ParamLossScatter) -> Result<(), AppError> {
    let points = finite_points("loss scatter", scatter.points.iter().copied());
    let xr = padded_range(points.iter().map(|p| p.0));
    let yr = padded_range(points.iter().map(|p| p.1));

    draw_svg(path, FIGURE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(format!("Loss function vs {}", scatter.param), CAPTION_FONT)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xr, yr)?;
        chart
            .configure_mesh()
            .x_desc(scatter.param.as_str())
            .y_desc("MSE")
            .draw()?;
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 2, BLACK.filled())))?;
        Ok(())
    })
}

fn band_polygon(band: &ErrorBand) -> Vec<(f64, f64)> {
    let upper = band
        .mean
        .iter()
        .zip(&band.std)
        .enumerate()
        .map(|(i, (m, s))| (i as f64, m + s));
    let lower: Vec<(f64, f64)> = band
        .mean
        .iter()
        .zip(&band.std)
        .enumerate()
        .map(|(i, (m, s))| (i as f64, m - s))
        .collect();
    finite_points("error band", upper.chain(lower.into_iter().rev()))
}

/// Relative MC error against relative model error, per bin.
pub fn error_bands(path: &Path, mc: &ErrorBand, model: &ErrorBand) -> Result<(), AppError> {
    let mc_line = finite_points(
        "MC error",
        mc.mean.iter().enumerate().map(|(i, &m)| (i as f64, m)),
    );
    let model_line = finite_points(
        "model error",
        model.mean.iter().enumerate().map(|(i, &m)| (i as f64, m)),
    );
    let mc_area = band_polygon(mc);
    let model_area = band_polygon(model);

    let xr = padded_range(mc_line.iter().chain(&model_line).map(|p| p.0));
    let top = mc
        .mean
        .iter()
        .zip(&mc.std)
        .map(|(m, s)| m + s)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let y_max = if top > 0.0 { top } else { 1.0 };
    let yr = 0.0..y_max;

    let sky = RGBColor(0, 191, 255);
    let orange = RGBColor(255, 165, 0);
    draw_svg(path, FIGURE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Relative error for MC runs vs Model predictions", CAPTION_FONT)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xr, yr)?;
        chart
            .configure_mesh()
            .x_desc("bin")
            .y_desc("Relative error (%)")
            .draw()?;

        chart.draw_series(std::iter::once(Polygon::new(mc_area, sky.mix(0.5).filled())))?;
        chart.draw_series(std::iter::once(Polygon::new(model_area, orange.mix(0.5).filled())))?;
        chart
            .draw_series(LineSeries::new(mc_line.iter().copied(), sky.stroke_width(2)))?
            .label("MC run mean error")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], sky));
        chart
            .draw_series(LineSeries::new(model_line.iter().copied(), orange.stroke_width(2)))?
            .label("Model mean error")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], orange));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Parameter correlation heatmap with the coefficient printed in each cell.
pub fn correlations(path: &Path, names: &[String], corr: &DMatrix<f64>) -> Result<(), AppError> {
    let n = corr.nrows();
    if n == 0 || !corr.is_square() || names.len() != n {
        return Err(AppError::plot(format!(
            "Correlation matrix {}x{} does not match {} parameter names.",
            corr.nrows(),
            corr.ncols(),
            names.len()
        )));
    }
    let range = -0.5..(n as f64 - 0.5);
    // Row 0 at the top.
    let row_y = |i: usize| (n - 1 - i) as f64;
    let name_at = |v: f64, flip: bool| -> String {
        let r = v.round();
        if (v - r).abs() > 1e-6 || r < 0.0 || r >= n as f64 {
            return String::new();
        }
        let i = if flip { n - 1 - r as usize } else { r as usize };
        names[i].clone()
    };
    let x_fmt = |v: &f64| name_at(*v, false);
    let y_fmt = |v: &f64| name_at(*v, true);

    let side = (120 + 80 * n as u32).clamp(400, 1200);
    draw_svg(path, (side, side), |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Parameter correlations", CAPTION_FONT)
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(range.clone(), range.clone())?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n)
            .y_labels(n)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .draw()?;

        chart.draw_series((0..n).flat_map(|i| {
            (0..n).map(move |j| {
                let (x, y) = (j as f64, row_y(i));
                Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    diverging_color(corr[(i, j)]).filled(),
                )
            })
        }))?;
        chart.draw_series((0..n).flat_map(|i| {
            (0..n).map(move |j| {
                Text::new(
                    format!("{:.2}", corr[(i, j)]),
                    (j as f64 - 0.2, row_y(i) + 0.1),
                    ("sans-serif", 14).into_font(),
                )
            })
        }))?;
        Ok(())
    })
}

/// MC envelope, data points and best-fit line of the upper comparison panel.
fn comparison_series<'a, Y>(
    mut chart: ChartContext<'a, SVGBackend<'a>, Cartesian2d<RangedCoordf64, Y>>,
    envelope: &[(f64, f64)],
    data: &[(f64, f64, f64)],
    prediction: &[(f64, f64)],
) -> DrawResult
where
    Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let yellow = RGBColor(255, 255, 0);
    chart.configure_mesh().draw()?;
    chart
        .draw_series(std::iter::once(Polygon::new(envelope.to_vec(), yellow.filled())))?
        .label("MC runs")
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], yellow.filled()));
    chart.draw_series(
        data.iter()
            .map(|&(x, y, e)| ErrorBar::new_vertical(x, y - e, y, y + e, BLACK.filled(), 6)),
    )?;
    chart
        .draw_series(data.iter().map(|&(x, y, _)| Circle::new((x, y), 3, BLACK.filled())))?
        .label("data")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));
    chart
        .draw_series(LineSeries::new(prediction.iter().copied(), RED.stroke_width(2)))?
        .label("best model")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Data, best-fit prediction and MC envelope of one observable, with a ratio
/// panel below.
pub fn observable(path: &Path, cmp: &ObservableComparison<'_>) -> Result<(), AppError> {
    let h = &cmp.observable.histogram;
    let title = h.title.as_str();

    let envelope = finite_points(
        "MC envelope",
        h.x.iter()
            .copied()
            .zip(cmp.envelope.dn.iter().copied())
            .chain(h.x.iter().copied().zip(cmp.envelope.up.iter().copied()).rev()),
    );
    let prediction = finite_points("prediction", h.x.iter().copied().zip(cmp.prediction.iter().copied()));
    let data: Vec<(f64, f64, f64)> = h
        .x
        .iter()
        .zip(&h.y)
        .zip(&h.yerr)
        .map(|((&x, &y), &e)| (x, y, e))
        .filter(|(x, y, e)| x.is_finite() && y.is_finite() && e.is_finite())
        .collect();

    let ratio_data: Vec<(f64, f64)> = data
        .iter()
        .map(|&(x, y, e)| (x, e / y))
        .filter(|(_, r)| r.is_finite())
        .collect();
    let ratio_prediction = finite_points(
        "prediction ratio",
        h.x.iter()
            .zip(cmp.prediction.iter().zip(&h.y))
            .map(|(&x, (&p, &y))| (x, p / y)),
    );

    let xr = padded_range(
        h.x.iter()
            .zip(h.xerr_minus.iter().zip(&h.xerr_plus))
            .flat_map(|(&x, (&lo, &hi))| [x - lo, x + hi]),
    );
    let upper_ys = || {
        envelope
            .iter()
            .chain(&prediction)
            .map(|p| p.1)
            .chain(data.iter().flat_map(|&(_, y, e)| [y - e, y + e]))
    };
    let ry = padded_range(
        ratio_data
            .iter()
            .flat_map(|&(_, r)| [1.0 - r, 1.0 + r])
            .chain(ratio_prediction.iter().map(|p| p.1)),
    );

    draw_svg(path, (800, 900), |root| {
        let (upper, lower) = root.split_vertically(560);

        let mut builder = ChartBuilder::on(&upper);
        builder
            .caption(title, CAPTION_FONT)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60);
        match log_range(upper_ys()) {
            Some(yr) => {
                let chart = builder.build_cartesian_2d(xr.clone(), yr.log_scale())?;
                comparison_series(chart, &envelope, &data, &prediction)?;
            }
            None => {
                let chart = builder.build_cartesian_2d(xr.clone(), padded_range(upper_ys()))?;
                comparison_series(chart, &envelope, &data, &prediction)?;
            }
        }

        let mut ratio = ChartBuilder::on(&lower)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xr, ry)?;
        ratio.configure_mesh().y_desc("ratio to data").draw()?;
        ratio.draw_series(
            ratio_data
                .iter()
                .map(|&(x, r)| ErrorBar::new_vertical(x, 1.0 - r, 1.0, 1.0 + r, BLACK.filled(), 6)),
        )?;
        ratio.draw_series(ratio_data.iter().map(|&(x, _)| Circle::new((x, 1.0), 3, BLACK.filled())))?;
        ratio.draw_series(LineSeries::new(ratio_prediction.iter().copied(), RED.stroke_width(2)))?;
        Ok(())
    })
}

/// Relative error of the tuned value against the true value of one parameter.
pub fn benchmark(path: &Path, scatter: &BenchmarkScatter) -> Result<(), AppError> {
    let points = finite_points(
        "benchmark",
        scatter
            .true_values
            .iter()
            .copied()
            .zip(scatter.relative_errors.iter().copied()),
    );
    let xr = padded_range(points.iter().map(|p| p.0));
    let yr = padded_range(points.iter().map(|p| p.1));

    draw_svg(path, FIGURE_SIZE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(format!("Relative difference on {}", scatter.param), CAPTION_FONT)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xr, yr)?;
        chart
            .configure_mesh()
            .x_desc(scatter.param.as_str())
            .y_desc("Relative difference (%)")
            .draw()?;
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, BLACK.filled())))?;
        Ok(())
    })
}

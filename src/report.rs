use log::info;
use std::fmt::Write;
use std::path::Path;

use crate::error::{Result, TourError};
use crate::model::Waypoint;
use crate::pipeline::{PlannedRoute, ORIGIN};

// =================== OUTPUT FUNCTIONS ===================

/// Formats the planned route as a stop-by-stop table.
///
/// Each line shows the waypoint, its coordinates, the leg from the previous
/// stop and the running total. The closing line returns to the origin.
pub fn render_route(planned: &PlannedRoute, waypoints: &[Waypoint]) -> String {
    let mut out = String::new();
    let stops = planned.route.stops();

    let _ = writeln!(out, "{:<5} {:<24} {:>11} {:>11} {:>12} {:>12}", "Stop", "Waypoint", "Latitude", "Longitude", "Leg", "Total");
    let _ = writeln!(out, "{:-<80}", "");

    let mut total = 0.0;
    for (position, &idx) in stops.iter().enumerate() {
        let Some(waypoint) = waypoints.get(idx) else {
            continue;
        };

        let leg = match position {
            0 => None,
            _ => planned.matrix.get(stops[position - 1], idx),
        };
        total += leg.unwrap_or(0.0);

        let leg_text = leg.map_or_else(|| "-".to_string(), |d| format!("{:.2}", d));
        let _ = writeln!(
            out,
            "{:<5} {:<24} {:>11.6} {:>11.6} {:>12} {:>12.2}",
            position, waypoint.name, waypoint.latitude, waypoint.longitude, leg_text, total
        );
    }

    let _ = writeln!(out, "{:-<80}", "");
    let _ = writeln!(out, "Objective value (total distance): {:.2}", planned.distance);
    let _ = writeln!(out, "Generations: {} ({:?})", planned.generations, planned.stop_reason);
    out
}

fn plot_err<E: std::fmt::Display>(e: E) -> TourError {
    TourError::Plot(e.to_string())
}

/// Draws the closed route over longitude/latitude into a PNG file.
///
/// The origin is drawn as a filled square, other waypoints as dots labelled
/// with their position along the route.
pub fn generate_plot(planned: &PlannedRoute, waypoints: &[Waypoint], title: &str, output_file: &Path) -> Result<()> {
    use plotters::prelude::*;

    let Some(origin) = waypoints.get(ORIGIN) else {
        return Err(TourError::DegenerateInput { count: 0 });
    };

    // Find the coordinate range to size the drawing area
    let mut min_x = origin.longitude;
    let mut max_x = origin.longitude;
    let mut min_y = origin.latitude;
    let mut max_y = origin.latitude;

    for waypoint in waypoints {
        min_x = min_x.min(waypoint.longitude);
        max_x = max_x.max(waypoint.longitude);
        min_y = min_y.min(waypoint.latitude);
        max_y = max_y.max(waypoint.latitude);
    }

    let padding = ((max_x - min_x).max(max_y - min_y) / 10.0).max(1e-3);
    min_x -= padding;
    max_x += padding;
    min_y -= padding;
    max_y += padding;

    let root_area = BitMapBackend::new(output_file, (1024, 768)).into_drawing_area();
    root_area.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root_area)
        .margin(20)
        .caption(format!("Tour for {}", title), ("sans-serif", 20).into_font())
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(min_x..max_x, min_y..max_y)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .draw()
        .map_err(plot_err)?;

    let route_points: Vec<(f64, f64)> = planned
        .ordered_waypoints(waypoints)
        .iter()
        .map(|w| (w.longitude, w.latitude))
        .collect();

    chart
        .draw_series(LineSeries::new(route_points, BLUE.stroke_width(2)))
        .map_err(plot_err)?
        .label(format!("Total {:.2}", planned.distance))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    // Origin as a big square
    let half = padding / 5.0;
    chart
        .draw_series(std::iter::once(Rectangle::new(
            [
                (origin.longitude - half, origin.latitude - half),
                (origin.longitude + half, origin.latitude + half),
            ],
            BLACK.filled(),
        )))
        .map_err(plot_err)?;

    chart
        .draw_series(
            waypoints
                .iter()
                .skip(1)
                .map(|w| Circle::new((w.longitude, w.latitude), 4, RED.filled())),
        )
        .map_err(plot_err)?;

    for (position, &idx) in planned.route.open().iter().enumerate() {
        let Some(waypoint) = waypoints.get(idx) else {
            continue;
        };
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{}", position),
                (waypoint.longitude + half, waypoint.latitude + half),
                ("sans-serif", 12).into_font(),
            )))
            .map_err(plot_err)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.filled())
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(plot_err)?;

    root_area.present().map_err(plot_err)?;
    info!("Plot generated: {}", output_file.display());

    Ok(())
}

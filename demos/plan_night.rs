use std::env;
use std::fs;

use hifitime::Unit;
use skyplan::observers::Observer;
use skyplan::planner::SkyPlanner;
use skyplan::skyplan_errors::SkyPlanError;
use skyplan::time::{format_utc, CalendarDate, LocalTime};

/// Plan one night from the command line.
/// Usage:
///   plan_night <LAT> <LON> <YYYY-MM-DD> [TARGET] [--png FILE]
/// Example:
///   RUST_LOG=debug plan_night 48.8566 2.3522 2024-01-15 M42 --png sky.png
#[tokio::main]
async fn main() -> Result<(), SkyPlanError> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let png_path = args
        .iter()
        .position(|a| a == "--png")
        .and_then(|i| args.get(i + 1).cloned());
    let positional: Vec<&String> = args
        .iter()
        .enumerate()
        .filter(|(i, a)| a.as_str() != "--png" && (*i == 0 || args[i - 1] != "--png"))
        .map(|(_, a)| a)
        .collect();
    if positional.len() < 3 {
        eprintln!("usage: plan_night <LAT> <LON> <YYYY-MM-DD> [TARGET] [--png FILE]");
        std::process::exit(2);
    }

    let parse = |s: &str| {
        s.parse::<f64>()
            .map_err(|e| SkyPlanError::InvalidInput(format!("{s}: {e}")))
    };
    let (latitude, longitude) = (parse(positional[0])?, parse(positional[1])?);
    let date: CalendarDate = positional[2].parse()?;
    let target = positional.get(3).map_or("M42", |t| t.as_str());

    let planner = SkyPlanner::from_default_config()?;
    let offset = LocalTime::nautical_offset(longitude);

    println!("== Light pollution ==");
    let lp = planner.light_pollution(latitude, longitude)?;
    println!(
        "Bortle {} ({:.2} mag/arcsec²){} - {}",
        lp.bortle_scale,
        lp.sky_brightness_mpsas,
        if lp.degraded { " [estimated]" } else { "" },
        lp.description
    );

    println!("\n== Sun and Moon ==");
    let days = planner
        .solar_lunar_events_async(latitude, longitude, date, 1)
        .await?;
    for day in &days {
        let show = |e: Option<hifitime::Epoch>| {
            e.map_or("-".to_string(), |e| LocalTime::new(e, offset).to_string())
        };
        println!("{}  {:?}", day.date, day.sun_condition);
        println!("  sunrise       {}", show(day.sunrise));
        println!("  solar noon    {}", show(day.solar_noon));
        println!("  sunset        {}", show(day.sunset));
        println!("  astro dusk    {}", show(day.astronomical_twilight_end));
        println!("  moon          {} ({:.0}%)", day.moon_phase, day.moon_illumination * 100.0);
    }

    println!("\n== Imaging {target} ==");
    let result = planner
        .best_imaging_time_async(target, latitude, longitude, date, None)
        .await?;
    match result.best {
        Some(best) => println!(
            "{}: best at {} (alt {:.1}°, az {:.1}°, score {:.1})",
            result.target_name, best.local, best.altitude_deg, best.azimuth_deg, best.quality_score
        ),
        None => println!("{}: no suitable time", result.target_name),
    }
    println!("{}", result.recommendation);

    if let Some(path) = png_path {
        let observer = Observer::at_sea_level(latitude, longitude)?;
        let instant = date.local_mean_midnight(longitude) + Unit::Day * 1.0;
        let map = planner
            .render_sky_async(observer, instant, planner.default_map_options())
            .await?;
        fs::write(&path, &map.png)?;
        println!(
            "\nsky map at {} written to {path}: {} stars plotted",
            format_utc(&instant),
            map.stars_visible
        );
    }
    Ok(())
}

use std::path::Path;

use reloj_shared::api::CityTimeDto;
use tracing::info;

use super::{Context, follow};
use crate::AppError;
use crate::cli::{AlarmCommand, StopwatchCommand, TimerCommand};
use crate::config::save_config;
use crate::display::{render_alarm, render_city, render_env, render_stopwatch, render_timer};

pub async fn alarm(ctx: &Context, action: AlarmCommand) -> Result<(), AppError> {
    let alarms = ctx.alarms();
    match action {
        AlarmCommand::List => {
            let list = alarms.refresh().await?;
            if list.is_empty() {
                println!("no alarms");
            }
            for a in &list {
                println!("{}", render_alarm(a));
            }
        }
        AlarmCommand::Add { time, label } => {
            let created = alarms.add(&time, label).await?;
            println!("added {}", render_alarm(&created));
        }
        AlarmCommand::Remove { id } => {
            alarms.remove(id).await?;
            println!("removed #{id}");
        }
    }
    Ok(())
}

pub async fn timer(ctx: &Context, action: TimerCommand) -> Result<(), AppError> {
    let timer = ctx.timer();
    match action {
        TimerCommand::Start {
            minutes,
            follow: keep_following,
        } => {
            let state = timer.start_minutes(minutes).await?;
            println!("{}", render_timer(&state));
            if keep_following {
                follow(timer.subscribe(), render_timer, |s| !s.running).await;
            }
            timer.detach().await;
        }
        TimerCommand::Stop => println!("{}", render_timer(&timer.stop().await?)),
        TimerCommand::Reset => println!("{}", render_timer(&timer.reset().await?)),
        TimerCommand::Status => println!("{}", render_timer(&timer.status().await?)),
    }
    Ok(())
}

pub async fn stopwatch(ctx: &Context, action: StopwatchCommand) -> Result<(), AppError> {
    let sw = ctx.stopwatch();
    match action {
        StopwatchCommand::Start {
            follow: keep_following,
        } => {
            let state = sw.start().await?;
            println!("{}", render_stopwatch(&state));
            if keep_following {
                follow(sw.subscribe(), render_stopwatch, |s| !s.running).await;
            }
            sw.detach().await;
        }
        StopwatchCommand::Stop => println!("{}", render_stopwatch(&sw.stop().await?)),
        StopwatchCommand::Reset => println!("{}", render_stopwatch(&sw.reset().await?)),
        StopwatchCommand::Status => println!("{}", render_stopwatch(&sw.status().await?)),
    }
    Ok(())
}

fn render_cities(times: &[CityTimeDto]) -> String {
    times.iter().map(render_city).collect::<Vec<_>>().join("\n")
}

pub async fn world(
    ctx: &Context,
    cities: Vec<String>,
    all: bool,
    keep_following: bool,
) -> Result<(), AppError> {
    let cities = if cities.is_empty() {
        ctx.cfg.cities.clone()
    } else {
        cities
    };
    let widget = ctx.world_clock(cities);

    if all {
        for t in widget.all().await?.values() {
            println!("{}", render_city(t));
        }
        return Ok(());
    }

    if keep_following {
        // the poller's first tick prints the initial table
        let rx = widget.subscribe();
        widget.start().await;
        follow(rx, |t: &Vec<CityTimeDto>| render_cities(t), |_| false).await;
        widget.stop().await;
    } else {
        println!("{}", render_cities(&widget.refresh().await));
    }
    Ok(())
}

pub async fn cities(ctx: &Context) -> Result<(), AppError> {
    let widget = ctx.world_clock(Vec::new());
    for c in widget.available_cities().await? {
        println!("{c}");
    }
    Ok(())
}

pub async fn env(ctx: &Context, city: Option<String>, keep_following: bool) -> Result<(), AppError> {
    let widget = ctx.env_clock(city.unwrap_or_else(|| ctx.cfg.env_city.clone()));
    if !keep_following {
        let report = widget.refresh().await;
        println!("{}", render_env(&report.data, report.offline));
    } else {
        let rx = widget.subscribe();
        widget.start().await;
        follow(
            rx,
            |r| {
                r.as_ref()
                    .map(|r| render_env(&r.data, r.offline))
                    .unwrap_or_default()
            },
            |_| false,
        )
        .await;
        widget.stop().await;
    }
    Ok(())
}

pub fn init(ctx: &Context, path: &Path, force: bool) -> Result<(), AppError> {
    if path.exists() && !force {
        return Err(AppError::Config(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    save_config(path, &ctx.cfg)?;
    info!(path=%path.display(), "config written");
    println!("wrote {}", path.display());
    Ok(())
}

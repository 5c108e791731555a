//! Terminal preview of the game table strip
//!
//! Drives the engine with a synthetic clock and prints every rendered frame
//! as a row of 24-bit colored blocks.
//!
//! Usage: cargo run -p gametable-preview -- --players 3 --active-player 2

use std::fmt::Write as _;

use clap::Parser;
use gametable_zones::{Animation, Command, EngineTimings, Engine, PlayerDelta, RGB8};
use smart_leds::brightness;

fn parse_animation(name: &str) -> Result<Animation, String> {
    Animation::from_name(name)
        .ok_or_else(|| format!("unknown animation '{name}' (rainbow, theater_chase, breathing)"))
}

#[derive(Parser, Debug)]
#[command(name = "gametable-preview")]
#[command(about = "Preview the game table LED engine in the terminal")]
struct Args {
    /// Number of LEDs on the strip
    #[arg(short, long, default_value = "60")]
    leds: usize,

    /// Number of players around the table
    #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=8))]
    players: u8,

    /// Highlight this player (1-based)
    #[arg(short, long)]
    active_player: Option<u8>,

    /// Run an animation: rainbow, theater_chase or breathing
    #[arg(long, value_parser = parse_animation)]
    animation: Option<Animation>,

    /// Strip brightness (0-255)
    #[arg(short, long, default_value = "50")]
    brightness: u8,

    /// Number of loop iterations to simulate
    #[arg(short, long, default_value = "20")]
    ticks: u64,

    /// Simulated milliseconds per loop iteration
    #[arg(long, default_value = "10")]
    tick_ms: u64,
}

/// The commands a web client would send to reach the requested setup
fn setup_commands(args: &Args) -> Vec<Command> {
    let mut commands: Vec<Command> = (1..args.players)
        .map(|_| Command::AdjustPlayers(PlayerDelta::Increment))
        .collect();
    commands.push(Command::SetBrightness(args.brightness));
    if args.active_player.is_some() {
        commands.push(Command::SetActivePlayer(args.active_player));
    }
    if args.animation.is_some() {
        commands.push(Command::StartAnimation(args.animation));
    }
    commands
}

/// Run the engine and collect `(time_ms, pixels)` for every painted frame,
/// starting with the frame right after setup.
fn simulate(args: &Args) -> (Engine, Vec<(u64, Vec<RGB8>)>) {
    let mut engine = Engine::new(args.leds, EngineTimings::default());
    for command in setup_commands(args) {
        engine.apply(command);
    }

    let mut frames = vec![(0, engine.pixels().to_vec())];
    for tick in 0..args.ticks {
        let now_ms = tick * args.tick_ms;
        if engine.tick(now_ms) {
            frames.push((now_ms, engine.pixels().to_vec()));
        }
    }
    (engine, frames)
}

/// One ANSI truecolor block per pixel, scaled the same way the strip is
fn render_frame(pixels: &[RGB8], level: u8) -> String {
    let mut line = String::with_capacity(pixels.len() * 24);
    for pixel in brightness(pixels.iter().copied(), level) {
        let _ = write!(line, "\x1b[38;2;{};{};{}m\u{2588}", pixel.r, pixel.g, pixel.b);
    }
    line.push_str("\x1b[0m");
    line
}

fn main() {
    let args = Args::parse();

    let (engine, frames) = simulate(&args);
    for (now_ms, pixels) in &frames {
        println!("{now_ms:>6} ms {}", render_frame(pixels, engine.brightness()));
    }

    let snapshot = engine.snapshot();
    println!(
        "{} players, active player {:?}, active zone {:?}, animation {:?}",
        snapshot.player_count, snapshot.active_player, snapshot.active_zone, snapshot.animation
    );
}

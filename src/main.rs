use beatsheet::beats::partition;
use beatsheet::drums::PercussionCue;
use beatsheet::highlight::DisplayEvent;
use beatsheet::syllables::LineDensity;
use beatsheet::Session;
use serde::Serialize;
use std::env;
use std::fs;
use std::process;
use std::time::Duration;

const USAGE: &str = "Usage: beatsheet split <input.sheet|project.json> [output.txt]
       beatsheet count <line...>
       beatsheet simulate <input.sheet|project.json> [--bars N] [--json]";

/// Longest simulation the CLI accepts.
const MAX_BARS: u64 = 10_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimedEvent<'a> {
    time_ms: f64,
    #[serde(flatten)]
    event: &'a DisplayEvent,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    match args[1].as_str() {
        "split" => split(&args[2], args.get(3)),
        "count" => count(&args[2..].join(" ")),
        "simulate" => simulate(&args[2], &args[3..]),
        other => {
            eprintln!("Unknown command '{}'", other);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    }
}

fn read_source(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn split(input_path: &str, output_path: Option<&String>) {
    let source = read_source(input_path);

    let text = match beatsheet::split_sheet(&source) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &text) {
                eprintln!("Error writing to '{}': {}", path, e);
                process::exit(1);
            }
            eprintln!("Wrote split sheet to {}", path);
        }
        None => {
            println!("{}", text);
        }
    }
}

fn count(line: &str) {
    let groups = partition(line);
    let per_beat: Vec<String> = groups.syllables.iter().map(u32::to_string).collect();
    println!("{}", groups.to_split_line());
    println!(
        "{} syllables ({}), {:?}",
        groups.total_syllables(),
        per_beat.join(" + "),
        LineDensity::classify(groups.total_syllables())
    );
}

fn simulate(input_path: &str, flags: &[String]) {
    let mut bars: u64 = 1;
    let mut json = false;

    let mut i = 0;
    while i < flags.len() {
        match flags[i].as_str() {
            "--json" => json = true,
            "--bars" => {
                i += 1;
                bars = match flags.get(i).and_then(|n| n.parse().ok()) {
                    Some(n) if (1..=MAX_BARS).contains(&n) => n,
                    _ => {
                        eprintln!("--bars needs a number from 1 to {}", MAX_BARS);
                        process::exit(1);
                    }
                };
            }
            other => {
                eprintln!("Unknown flag '{}'", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let project = match beatsheet::load(&read_source(input_path)) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let interval = project.tempo.sixteenth_interval();
    let mut session: Session<Vec<DisplayEvent>, Vec<PercussionCue>> =
        Session::new(project, Vec::new(), Vec::new());

    session.start_metronome();
    print_events(&mut session, json);
    for step in 1..bars * 16 {
        let Some(at) = step_time(interval, step) else {
            eprintln!("Simulation time overflowed at step {}", step);
            process::exit(1);
        };
        session.advance_to(at);
        print_events(&mut session, json);
    }
    session.stop_metronome();
    print_events(&mut session, json);

    eprintln!(
        "Simulated {} bars at {} bpm: {} percussion steps",
        bars,
        session.project().tempo.bpm(),
        session.percussion().len()
    );
}

/// Start time of the `step`-th sixteenth, `None` if it does not fit a `Duration`.
fn step_time(interval: Duration, step: u64) -> Option<Duration> {
    let nanos = interval.as_nanos().checked_mul(u128::from(step))?;
    u64::try_from(nanos).ok().map(Duration::from_nanos)
}

fn print_events(session: &mut Session<Vec<DisplayEvent>, Vec<PercussionCue>>, json: bool) {
    let time_ms = session.now().as_secs_f64() * 1000.0;
    for event in session.display_mut().drain(..) {
        if json {
            match serde_json::to_string(&TimedEvent { time_ms, event: &event }) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("Error encoding event: {}", e),
            }
        } else {
            println!("{:>10.1}ms  {:?}", time_ms, event);
        }
    }
}

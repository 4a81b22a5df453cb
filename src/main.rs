use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use taskswap::lifecycle::{Category, Outcome, PickedFile, TaskStatus};
use taskswap::pricing::{BoostTier, SubscriptionTier};
use taskswap::query::{apply_filters, paginate, StatusCounters, TaskFilter, DEFAULT_PAGE_SIZE};
use taskswap::store::LoadOutcome;
use taskswap::{logging, App, Channel, Config, Event, Section, StoreError};

const HELP: &str = "\
commands:
  state                         show balances and counters
  tasks [status] [page]         list marketplace tasks (status: open, in-progress, delivered, done, disputed, all)
  accept|deliver|confirm|dispute <id>
  attach <id> <name> <bytes>    attach a file to a task
  detach <id> <file-id>         remove an attachment
  files <id>                    list attachments
  starter <s1|s2|s3>            mark a starter task done
  post                          record the first posted task
  gates                         show which sections are locked
  go <section>                  navigate to a section
  dismiss                       click the premium prompt
  boost <bronze|silver|gold> [subscription]
  quote <percent> <months> [subscription]
  reset                         restore the default snapshot
  help | quit";

fn main() -> ExitCode {
    let config = Config::load();
    logging::init(&config.log_filter);

    let app = match App::open(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "failed to open state");
            return ExitCode::FAILURE;
        }
    };
    if let LoadOutcome::Defaults(reason) = app.load_outcome() {
        tracing::info!(?reason, dir = %config.state_dir.display(), "starting from default state");
    }

    let toasts = app.bus().subscribe(Channel::Toast, |event| {
        if let Event::Toast(t) = event {
            match &t.body {
                Some(body) => println!("{} {} — {}", t.icon, t.title, body),
                None => println!("{} {}", t.icon, t.title),
            }
        }
    });
    let nav = app.bus().subscribe(Channel::Nav, |event| {
        if let Event::Nav(section) = event {
            println!("→ {section}");
        }
    });

    println!("TaskSwap: trade time, not money. Type `help` for commands.");
    println!("→ {}", app.landing_section());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = words.split_first() else {
            continue;
        };
        if matches!(cmd, "quit" | "exit") {
            break;
        }
        if let Err(e) = run(&app, cmd, args) {
            tracing::error!(error = %e, command = cmd, "command failed");
        }
        let _ = io::stdout().flush();
    }

    toasts.unsubscribe();
    nav.unsubscribe();
    ExitCode::SUCCESS
}

fn run(app: &App, cmd: &str, args: &[&str]) -> Result<(), StoreError> {
    let task_id = || args.first().and_then(|a| a.parse().ok());
    match cmd {
        "help" => println!("{HELP}"),
        "state" => print_state(app),
        "tasks" => print_tasks(app, args),
        "accept" | "deliver" | "confirm" | "dispute" => {
            let Some(id) = task_id() else {
                println!("usage: {cmd} <task-id>");
                return Ok(());
            };
            let engine = app.engine();
            let outcome = match cmd {
                "accept" => engine.accept(id)?,
                "deliver" => engine.deliver(id)?,
                "confirm" => engine.confirm(id)?,
                _ => engine.dispute(id)?,
            };
            if outcome == Outcome::NotFound {
                println!("no task {id}");
            }
        }
        "attach" => match (task_id(), args.get(1), args.get(2).and_then(|s| s.parse().ok())) {
            (Some(id), Some(name), Some(size)) => {
                if app.engine().add_files(id, vec![PickedFile::new(*name, size)])? == Outcome::NotFound {
                    println!("no task {id}");
                }
            }
            _ => println!("usage: attach <task-id> <name> <bytes>"),
        },
        "detach" => match (task_id(), args.get(1)) {
            (Some(id), Some(file_id)) => {
                if app.engine().remove_file(id, file_id)? == Outcome::NotFound {
                    println!("no file {file_id} on task {id}");
                }
            }
            _ => println!("usage: detach <task-id> <file-id>"),
        },
        "files" => {
            let Some(id) = task_id() else {
                println!("usage: files <task-id>");
                return Ok(());
            };
            for f in app.state().files_for(id) {
                println!("{}  {}  {} bytes  {}", f.id, f.name, f.size_bytes, f.url);
            }
        }
        "starter" => match args.first() {
            Some(id) => {
                if !app.complete_starter_task(id)? {
                    println!("{id} is unknown or already done");
                }
            }
            None => println!("usage: starter <s1|s2|s3>"),
        },
        "post" => {
            app.record_first_post()?;
        }
        "gates" => {
            let gates = app.gates();
            for section in Section::TABS {
                let mark = if gates.is_locked(section) { "locked" } else { "open" };
                println!("{:<12} {mark}", section.label());
            }
            if let Some(next) = gates.highlighted() {
                println!("next step: {next}");
            }
        }
        "go" => match Section::parse(&args.join(" ")) {
            Some(section) => {
                if app.navigate(section) && app.premium_visual().show_nudge_on(section) {
                    println!("⭐ LIMITED BOOST: double your profits for a whole day. (`dismiss` to open Premium)");
                }
            }
            None => println!("unknown section"),
        },
        "dismiss" => app.dismiss_premium_hint()?,
        "boost" => match args.first().and_then(|t| BoostTier::parse(t)) {
            Some(tier) => {
                app.buy_boost(tier, subscription(args.get(1)));
            }
            None => println!("usage: boost <bronze|silver|gold> [subscription]"),
        },
        "quote" => {
            let num = |i: usize| args.get(i).and_then(|s| s.trim_end_matches('%').parse().ok());
            match (num(0), num(1)) {
                (Some(pct), Some(months)) => {
                    app.activate_premium_time(pct, months, subscription(args.get(2)));
                }
                _ => println!("usage: quote <percent> <months> [subscription]"),
            }
        }
        "reset" => {
            app.reset()?;
            println!("state reset");
        }
        other => println!("unknown command `{other}`, try `help`"),
    }
    Ok(())
}

fn subscription(arg: Option<&&str>) -> SubscriptionTier {
    arg.and_then(|s| SubscriptionTier::parse(s)).unwrap_or_default()
}

fn print_state(app: &App) {
    let state = app.state();
    let visual = app.premium_visual();
    println!(
        "{} 👑  ⭐ {:.1}  🔥 {}-day  deliveries: {}  accepted: {:?}",
        state.tokens, state.reputation, state.streak, state.completed_jobs, state.my_accepted
    );
    println!(
        "premium tab: outline={} glow={} prompt={}",
        visual.outline, visual.glow, visual.bubble
    );
    for t in &state.starter_tasks {
        let mark = if t.done { "x" } else { " " };
        println!("[{mark}] {} {} ({})", t.id, t.title, t.description());
    }
}

fn print_tasks(app: &App, args: &[&str]) {
    let mut filter = TaskFilter::default();
    let mut page = 1;
    for arg in args {
        if *arg == "all" {
            filter.status = None;
        } else if let Some(status) = TaskStatus::parse(arg) {
            filter.status = Some(status);
        } else if let Some(category) = Category::parse(arg) {
            filter.category = Some(category);
        } else if let Ok(n) = arg.parse() {
            page = n;
        }
    }
    let tasks = app.engine().tasks();
    let listed = apply_filters(&tasks, &filter);
    let page = paginate(&listed, page, DEFAULT_PAGE_SIZE);
    for t in &page.items {
        println!(
            "#{:<3} {:<12} {:>3} 👑  ⭐ {:.1}  ~{}h  {}",
            t.id,
            t.status.label(),
            t.tokens,
            t.reputation,
            t.eta_hours,
            t.title
        );
    }
    let c = StatusCounters::tally(&tasks);
    println!(
        "page {}/{} ({} tasks) · open {} · in progress {} · delivered {} · done {}",
        page.page, page.pages, page.total, c.open, c.in_progress, c.delivered, c.done
    );
}

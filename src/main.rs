use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use argh::FromArgs;

use autoprofile::controller::{self, ProfileController, SystemClock, Trigger};
use autoprofile::gateway::SimulatedGateway;
use autoprofile::prefs::{self, ProfileStore};
use autoprofile::prefs_storage::PrefsStorage;
use autoprofile::status;

#[derive(FromArgs, Debug)]
/// Device profile automation: applies a stored settings profile (ringer,
/// vibrate, ring volume, wifi, brightness) and re-checks device state after
/// a settle delay.
struct Args {
    /// apply the stored profile to the device now
    #[argh(switch)]
    apply: bool,

    /// toggle brightness between the configured min/max bounds
    #[argh(switch)]
    toggle_brightness: bool,

    /// request a deferred re-check and wait for it to fire
    #[argh(switch)]
    check: bool,

    /// print the currently observable device settings and exit
    #[argh(switch)]
    status: bool,

    /// keep running and re-check whenever a preference changes
    #[argh(switch)]
    watch: bool,

    /// set a preference, e.g. autoprofile.profile.ringer=silent (repeatable)
    #[argh(option)]
    set: Vec<String>,

    /// list all preference keys with their defaults and exit
    #[argh(switch)]
    list_prefs: bool,

    /// preference file path (default: ~/.config/autoprofile/Prefs.xresources)
    #[argh(option)]
    prefs: Option<PathBuf>,

    /// device state file path (default: ~/.config/autoprofile/Device.xresources)
    #[argh(option)]
    device_state: Option<PathBuf>,
}

fn init_logging() {
    if let Err(err) = syslog::init(
        syslog::Facility::LOG_USER,
        log::LevelFilter::Info,
        Some("autoprofile"),
    ) {
        eprintln!("Failed to initialize syslog logging: {err}");
    }
}

fn main() {
    let args: Args = argh::from_env();
    init_logging();

    if args.list_prefs {
        for spec in prefs::pref_specs() {
            if spec.default.is_empty() {
                println!("{}", spec.key);
            } else {
                println!("{}: {}", spec.key, spec.default);
            }
        }
        return;
    }

    let prefs_path = args
        .prefs
        .clone()
        .unwrap_or_else(PrefsStorage::default_prefs_path);
    let store = ProfileStore::new(PrefsStorage::new(prefs_path));
    store.ensure_defaults();

    for entry in &args.set {
        match prefs::parse_pref_arg(entry) {
            Ok((key, value)) => store.update(&key, &value),
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
    }

    let device_path = args
        .device_state
        .clone()
        .unwrap_or_else(PrefsStorage::default_device_path);
    let mut gateway = SimulatedGateway::load(PrefsStorage::new(device_path));
    let mut controller =
        ProfileController::new(SystemClock, gateway.tier(), store.settle_delay());

    if args.status {
        println!("{}", status::status_text(&controller::effective_profile(&gateway)));
        return;
    }

    let mut acted = false;

    if args.apply {
        let profile = store.load_profile();
        if profile.is_empty() {
            eprintln!("No profile fields are set; nothing to apply.");
        } else {
            let report = controller.apply_now(&mut gateway, &profile);
            println!("{report}");
        }
        acted = true;
    }

    if args.toggle_brightness {
        let range = store.load_brightness_range();
        match controller.toggle_brightness(&mut gateway, range) {
            Ok(percent) => println!("Brightness changed to {percent}"),
            Err(err) => eprintln!("Brightness toggle failed: {err}"),
        }
        acted = true;
    }

    if args.check {
        controller.request_check();
        acted = true;
    }

    if args.watch {
        let (trigger_tx, trigger_rx) = mpsc::channel::<Trigger>();
        let notify = controller::check_notify(&trigger_tx);
        store.subscribe(std::sync::Arc::new(move |_key| notify()));
        log::info!("watching for preference changes");
        controller::run_loop(controller, &mut gateway, &trigger_rx);
        return;
    }

    if acted {
        settle_and_report(&mut controller, &mut gateway);
        return;
    }

    if args.set.is_empty() {
        println!("{}", status::status_text(&controller::effective_profile(&gateway)));
    }
}

/// Wait out the pending settle delay, then print what the device settled on.
fn settle_and_report(
    controller: &mut ProfileController<SystemClock>,
    gateway: &mut SimulatedGateway,
) {
    while let Some(delay) = controller.next_wakeup_delay() {
        thread::sleep(delay);
        if controller.fire_due(gateway).is_some() {
            println!("{}", controller.current_status_text());
        }
    }
}

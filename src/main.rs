/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use log::{error, info};

use config::GameConfig;
use domain::classification::{ConfigStore, SceneClassifier};
use domain::progression::ProgressionGraph;
use sim::event::CourseEvent;
use sim::session::Session;
use ui::gamepad::GamepadState;
use ui::input::{InputState, Nav};
use ui::renderer::Renderer;
use ui::sound::{cue_for, Cue, SoundEngine};
use ui::state::{UiState, UiStateMachine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = GameConfig::load();
    let classifier = SceneClassifier::new(ConfigStore::new(config.override_path.clone()));
    let progression = ProgressionGraph::load_or_default(config.progression_path.as_deref());
    let ui = UiStateMachine::with_full_display(config.speed.transition(), config.ui.notification_seconds);
    let mut session = Session::new(classifier, progression, ui, config.speed.roll_rate);
    info!(
        "{} levels, classification override at {}",
        session.progression().len(),
        config.override_path.display()
    );

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        error!("terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        error!("terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!("game error: {e}");
    }

    println!();
    println!("Thanks for playing Ball Roll!");
    println!("Total score: {}", session.total_score());
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = config.speed.tick();
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let navs = kb.nav().into_iter().chain(gp.nav());
        match handle_nav(session, navs) {
            Flow::Quit => break,
            Flow::Handled => play(sound, Cue::Menu),
            Flow::Ignored => {}
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            let shown = session.ui().notifications().len();
            let roll = kb.roll().or(gp.roll());
            let events = session.update(elapsed, roll);
            process_sound_events(sound, &events);
            if session.ui().notifications().len() > shown {
                play(sound, Cue::Notify);
            }
            last_tick = Instant::now();
        }

        renderer.render(session)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn play(sound: Option<&SoundEngine>, cue: Cue) {
    if let Some(sfx) = sound {
        sfx.play(cue);
    }
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[CourseEvent]) {
    for cue in events.iter().filter_map(cue_for) {
        play(sound, cue);
    }
}

// ── Navigation ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Ignored,
    Handled,
    Quit,
}

/// Apply the first intent the current screen accepts; the rest are dropped
/// so one button bound to two actions cannot toggle a screen twice.
fn handle_nav(session: &mut Session, navs: impl IntoIterator<Item = Nav>) -> Flow {
    for nav in navs {
        let flow = dispatch(session, nav);
        if flow != Flow::Ignored {
            return flow;
        }
    }
    Flow::Ignored
}

fn dispatch(session: &mut Session, nav: Nav) -> Flow {
    let handled = match (session.ui().state(), nav) {
        // ── Main Menu ──
        (UiState::MainMenu, Nav::Confirm) => session.new_game(),
        (UiState::MainMenu, Nav::Quit | Nav::Cancel) => return Flow::Quit,

        // ── Gameplay ──
        (UiState::GamePlay, Nav::Pause | Nav::Cancel) => session.toggle_pause(),
        (UiState::GamePlay, Nav::Finish) => session.force_complete(),

        // ── Pause Menu ──
        (UiState::PauseMenu, Nav::Pause | Nav::Cancel | Nav::Confirm) => session.toggle_pause(),
        (UiState::PauseMenu, Nav::Retry) => session.retry(),
        (UiState::PauseMenu, Nav::Quit) => {
            session.return_to_main_menu();
            true
        }

        // ── Level Complete ──
        (UiState::LevelComplete, Nav::Confirm) => session.advance_level(),
        (UiState::LevelComplete, Nav::Retry) => session.retry(),
        (UiState::LevelComplete, Nav::Cancel | Nav::Quit) => {
            session.return_to_main_menu();
            true
        }

        _ => false,
    };
    if handled {
        Flow::Handled
    } else {
        Flow::Ignored
    }
}

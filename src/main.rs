// disable console in windows release builds
#![cfg_attr(
    all(
        target_os = "windows",
        not(debug_assertions),
    ),
    windows_subsystem = "windows"
)]

use macroquad::window::Conf;

fn conf() -> Conf {
    Conf {
        window_title: midiroll::APP_NAME.to_string(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(conf)]
async fn main() {
    env_logger::init();

    // optional path of a MIDI file to open on startup
    let arg = std::env::args().nth(1);

    if let Err(e) = midiroll::run(arg).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

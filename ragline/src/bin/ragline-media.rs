//! Describes images, transcribes audio and summarizes videos entered on stdin.
use anyhow::Result;
use ragline::{
    cli::{is_exit, Prompter, RULE},
    media::clean_input_path,
    services, Settings,
};

#[tokio::main]
async fn main() -> Result<()> {
    ragline::telemetry::init_tracing();

    let settings = Settings::load()?;
    let describer = services::media_describer(&settings)?;

    println!("{RULE}");
    println!("Media Description Service Started");
    println!("{RULE}");
    println!("   Supported formats: Video (.mp4, .avi, .mov), Image (.jpg, .png, .webp), Audio (.mp3, .wav, .flac, .m4a)");
    println!("   Type 'quit' to exit.");

    let mut prompter = Prompter::default();
    while let Some(input) = prompter.ask("\n(Input) Enter absolute file path: ").await? {
        let path = clean_input_path(&input);
        if is_exit(&path) {
            println!("Exiting...");
            break;
        }
        if path.is_empty() {
            continue;
        }

        let report = describer.describe(&path).await;

        println!("\n{RULE}");
        println!("--- GENERATED DESCRIPTION/TRANSCRIPT ---");
        println!("{report}");
        println!("{RULE}");
    }

    Ok(())
}

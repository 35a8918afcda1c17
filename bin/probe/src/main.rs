//! Renders the reference fixture once per selector and checks every encoding.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tessera::harness::{self, ComparisonError, ImageComparison};
use tessera::{Catalog, Color4, Selector};
use tessera_options::TestOptions;

type BoxedError = Box<dyn std::error::Error + 'static>;

#[derive(Parser, Debug, Default)]
#[command(about = "Check shader parameter marshalling against the reference fixture")]
struct Args {
    /// Test options in TOML: selectors, overrides, approximations and image checks.
    #[arg(long)]
    options: Option<PathBuf>,
    /// Run only these selectors. Overrides the selectors of the options file.
    #[arg(long = "selector")]
    selectors: Vec<i32>,
    /// Write each rendered case as a PNG into this directory, with difference images of failed
    /// comparisons.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// The outcome of one case.
struct Case {
    selector: Selector,
    color: Color4,
    failure: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    ExitCode::from(status(run(Args::parse())))
}

/// Exit status: `0` on success, `1` on failed cases, `2` if the run could not complete.
fn status(result: Result<bool, BoxedError>) -> u8 {
    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            2
        }
    }
}

fn run(args: Args) -> Result<bool, BoxedError> {
    let options = match &args.options {
        Some(path) => TestOptions::read(path)?,
        None => TestOptions::default(),
    };

    execute(options, &args)
}

fn execute(mut options: TestOptions, args: &Args) -> Result<bool, BoxedError> {
    if !args.selectors.is_empty() {
        log::debug!("Selectors from the command line: {:?}", args.selectors);
        options.selectors = Some(args.selectors.clone());
        options.validate()?;
    }

    if options.ignore {
        println!("ignored");
        return Ok(true);
    }

    let mut catalog = tessera_std::reference_catalog()?;
    options.apply(&mut catalog)?;

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)?;
    }

    let mut passed = true;
    for selector in options.selectors() {
        let Some(color) = tessera::evaluate(selector.index(), &catalog)? else {
            return Err(format!("{selector:?} fired no case").into());
        };

        let case = check(selector, color, &catalog, &options, args.output.as_deref())?;
        let [r, g, b, a] = case.color.0;
        match &case.failure {
            None => println!(
                "{:>2} {:?}: ({r}, {g}, {b}, {a}) ok",
                case.selector.index(),
                case.selector
            ),
            Some(why) => {
                passed = false;
                println!(
                    "{:>2} {:?}: ({r}, {g}, {b}, {a}) FAILED {why}",
                    case.selector.index(),
                    case.selector
                );
            }
        }
    }

    Ok(conclude(passed, options.known_failure))
}

/// Whether the run as a whole passes. A known failure must fail.
fn conclude(passed: bool, known_failure: bool) -> bool {
    match (passed, known_failure) {
        (passed, false) => passed,
        (false, true) => {
            log::warn!("Failures are expected for these options");
            true
        }
        (true, true) => {
            println!("known failure passed unexpectedly");
            false
        }
    }
}

/// Judge the color emitted for `selector`.
fn check(
    selector: Selector,
    color: Color4,
    catalog: &Catalog,
    options: &TestOptions,
    output: Option<&Path>,
) -> Result<Case, BoxedError> {
    let mut case = Case {
        selector,
        color,
        failure: None,
    };

    if let Err(mismatch) = harness::verify(selector, catalog, color, 0.0) {
        // Lanes may still be acceptable under the configured approximation.
        match approximate(selector, catalog, color, options) {
            Ok(()) if matches!(mismatch, harness::Mismatch::Lane { .. }) => {
                log::debug!("{mismatch}, accepted by approximation");
            }
            Ok(()) => case.failure = Some(mismatch.to_string()),
            Err(why) => case.failure = Some(why),
        }
    }

    let Some(dims) = &options.image else {
        return Ok(case);
    };

    let rendered = harness::solid(color, dims.width, dims.height);
    let name = format!("{:02}-{selector:?}", selector.index());

    if let Some(dir) = output {
        let path = dir.join(format!("{name}.png"));
        rendered.save_with_format(&path, image::ImageFormat::Png)?;
        log::info!("Wrote {}", path.display());
    }

    if case.failure.is_some() {
        return Ok(case);
    }

    let expected = harness::solid(
        harness::expected_color(selector, catalog)?,
        dims.width,
        dims.height,
    );

    if let Err(err) = ImageComparison::test_all(&options.image_checks(), &rendered, &expected) {
        if let (ComparisonError::Outliers { difference, .. }, Some(dir)) = (&err, output) {
            // A known failure would only spam files.
            if !options.known_failure {
                write_difference(dir, &name, difference)?;
            }
        }
        case.failure = Some(err.to_string());
    }

    Ok(case)
}

fn write_difference(
    dir: &Path,
    name: &str,
    difference: &harness::Difference,
) -> Result<(), BoxedError> {
    let path = dir.join(format!("{name}.difference-color.png"));
    difference
        .color_image()
        .save_with_format(&path, image::ImageFormat::Png)?;
    log::info!("Wrote {}", path.display());

    if let Some(alpha) = difference.alpha_image() {
        let path = dir.join(format!("{name}.difference-alpha.png"));
        alpha.save_with_format(&path, image::ImageFormat::Png)?;
        log::info!("Wrote {}", path.display());
    }

    Ok(())
}

/// Compare all decoded lanes with the configured approximation.
fn approximate(
    selector: Selector,
    catalog: &Catalog,
    color: Color4,
    options: &TestOptions,
) -> Result<(), String> {
    let approximations = options.approximations();
    let decoded = harness::decode(selector, color).ok_or("no lanes to decode")?;
    let stored = harness::expected(selector, catalog)
        .map_err(|err| err.to_string())?
        .unwrap_or_default();

    for (&found, &expected) in decoded.lanes.iter().zip(&stored) {
        approximations
            .compare(f64::from(found), f64::from(expected))
            .map_err(|err| err.to_string())?;
    }

    Ok(())
}

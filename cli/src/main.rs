#[macro_use] extern crate clap;

use burrow::{container::Unconfined, registry::Client, Container, ImageReference};
use clap::{App, ArgMatches};
use env_logger::{from_env, Env};
use std::error::Error;
use url::Url;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let yaml = load_yaml!("cli.yml");
    let matches = App::from_yaml(yaml)
        .version(crate_version!())
        .get_matches();

    let log_level = matches.value_of("log_level").unwrap_or("warn");
    from_env(Env::default().default_filter_or(log_level)).init();

    let code = match matches.subcommand() {
        ("run", Some(run_matches)) => match run(run_matches).await {
            Ok(code) => code,
            Err(err) => {
                report(err.as_ref());
                1
            }
        },
        _ => unreachable!(),
    };
    // Everything owned by the launch, the sandbox included, is gone by now.
    std::process::exit(code);
}

async fn run(matches: &ArgMatches<'_>) -> Result<i32, Box<dyn Error>> {
    let image: ImageReference = matches
        .value_of("image_reference")
        .unwrap_or_default()
        .parse()?;
    let mut command = string_values(matches, "command").into_iter();
    let program = command.next().unwrap_or_default();

    let mut client = Client::builder();
    if let Some(url) = matches.value_of("registry") {
        client = client.registry_url(Url::parse(url)?);
    }
    if let Some(url) = matches.value_of("auth_url") {
        client = client.auth_url(Url::parse(url)?);
    }
    let mut client = client.build()?;

    let mut container = Container::builder(program).args(command);
    for helper in string_values(matches, "helper") {
        container = container.helper(helper);
    }
    if let Some(dir) = matches.value_of("tmp_dir") {
        container = container.temp_dir(dir);
    }
    if matches.is_present("unconfined") {
        container = container.confinement(Unconfined);
    }

    let status = container.run(&mut client, &image).await?;
    log::info!("{} finished, {}", image, status);
    Ok(status.exit_code())
}

fn report(err: &dyn Error) {
    eprintln!("burrow: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

fn string_values<S: AsRef<str>>(matches: &ArgMatches, name: S) -> Vec<String> {
    matches
        .values_of(name)
        .into_iter()
        .flatten()
        .map(|value| value.to_string())
        .collect()
}

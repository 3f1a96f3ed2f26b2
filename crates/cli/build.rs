use std::{env, fs, path::PathBuf};

fn fetch_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let extract = fetch_args(
        clap::Command::new("extract")
            .about("Extract body text and metadata from a page")
            .arg(clap::arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin")),
    );

    let evaluate = fetch_args(
        clap::Command::new("evaluate")
            .about("Evaluate a product page against weighted criteria")
            .arg(clap::arg!(<URL> "Product page URL"))
            .arg(
                clap::arg!(--criteria <FILE> "JSON file with criteria (default: built-in criteria)")
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(std::path::PathBuf)),
            )
            .arg(clap::arg!(--name <NAME> "Product name (default: taken from page metadata)"))
            .arg(clap::arg!(--model <MODEL> "Inference model (overrides AI_MODEL_NAME)"))
            .arg(
                clap::arg!(--concurrency <NUM> "Maximum concurrent criterion analyses (0 = unbounded)")
                    .default_value("0"),
            )
            .arg(clap::arg!(--no_summary "Skip the narrative summary"))
            .arg(clap::arg!(--no_recommendations "Leave the recommendations section out of the summary")),
    );

    let mut cmd = clap::Command::new("assay")
        .version("0.1.0")
        .author("Assay Contributors")
        .about("Extract product pages and score them against weighted criteria")
        .subcommand(extract)
        .subcommand(evaluate)
        .subcommand(clap::Command::new("criteria").about("List the built-in evaluation criteria"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .global(true)
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (text, json)")
                .value_name("FORMAT")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"]),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "assay", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "assay", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "assay", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "assay", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}

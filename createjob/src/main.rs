mod args;

use std::time::Duration;

use anyhow::{Context, Result};
use storage_core::{ClientConfig, CreateJob, HmacSigner, JobItems, JobPhase, ListJobsInput, StorageClient};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run(args::parse_args()) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: args::Args) -> Result<()> {
    let secret = std::fs::read(&args.key_file)
        .with_context(|| format!("couldn't read key file {} for key {}", args.key_file.display(), args.key_id))?;
    let signer = HmacSigner::new(args.account.as_str(), args.key_id.as_str(), secret);
    let config = ClientConfig::new(&args.url, args.account.as_str()).context("NewClient")?;
    let client = StorageClient::new(config, signer);
    let jobs = client.jobs();
    let account = args.account.as_str();

    let job_id = jobs
        .create(&CreateJob {
            name: "WordCount".to_string(),
            phases: vec![
                JobPhase::map("wc"),
                JobPhase::reduce("awk '{ l += $1; w += $2; c += $3 } END { print l, w, c }'"),
            ],
        })
        .context("CreateJob")?;
    println!("Job ID: {job_id}");

    let books = ["treasure_island.txt", "moby_dick.txt", "huck_finn.txt", "dracula.txt"];
    let paths: Vec<String> = books
        .iter()
        .map(|book| format!("/{account}/stor/books/{book}"))
        .collect();
    jobs.add_inputs(&job_id, paths.as_slice()).context("AddJobInputs")?;
    jobs.add_inputs(&job_id, &[format!("/{account}/stor/books/sherlock_holmes.txt")])
        .context("AddJobInputs")?;

    let job = jobs.get(&job_id).context("GetJob")?;
    println!("{job:?}");
    println!("{:?}", job.stats);

    jobs.end_input(&job_id).context("EndJobInput")?;

    let list = jobs.list(&ListJobsInput::default()).context("ListJobs")?;
    println!("Number of jobs: {}", list.result_set_size);
    for job in &list.jobs {
        println!(" - {}", job.id);
    }

    print_items(jobs.get_input(&job_id).context("GetJobInput")?)?;

    std::thread::sleep(Duration::from_secs(args.wait_secs));

    print_items(jobs.get_output(&job_id).context("GetJobOutput")?)?;
    Ok(())
}

fn print_items(items: JobItems) -> Result<()> {
    println!("Result set size: {}", items.result_set_size);
    for line in items.lines() {
        println!(" - {}", line.context("reading result listing")?);
    }
    Ok(())
}

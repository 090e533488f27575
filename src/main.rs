//! inscribe CLI
//!
//! Usage:
//!   inscribe mint -k keys.txt --data 'data:,{"p":"erc-20"}' -i 1000   # Self transfers every second
//!   inscribe mint -k keys.txt --to 0x... --hex 0x00 --gas 2 -c 10    # 10 cycles to one address
//!   inscribe vanity -p '^0x.*888$' -w 4                              # Regex search on 4 threads
//!   inscribe vanity -p dead -t prefix -n 5                           # 5 addresses starting with "dead"

use std::error::Error;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use inscribe::config::{MintPlan, Plan, VanitySearch};
use inscribe::{rpc, Config, Dispatcher, LogBuffer, RpcClient, Scheduler, VanityResult, WorkerPool};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    // Validate configuration
    let plan = match config.validate() {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let result = match plan {
        Plan::Mint(plan) => run_mint(plan),
        Plan::Vanity(search) => run_vanity(search),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_mint(plan: MintPlan) -> Result<(), Box<dyn Error>> {
    println!("Batch Transaction Broadcaster");
    println!("=============================");
    println!("Accounts:    {}", plan.accounts.len());
    if plan.rejected_keys > 0 {
        println!("Skipped:     {} malformed key line(s)", plan.rejected_keys);
    }
    println!("RPC:         {}", plan.rpc_url);
    println!("Interval:    {}ms", plan.interval.as_millis());
    if let Some(cycles) = plan.cycles {
        println!("Cycles:      {}", cycles);
    }
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let log = Arc::new(LogBuffer::new());
        let transport = rpc::connect(&plan.rpc_url).await?;

        let mut dispatcher = Dispatcher::new(
            RpcClient::new(transport),
            plan.accounts,
            plan.builder,
            log.clone(),
        );
        if let Some(chain_id) = plan.chain_id {
            dispatcher = dispatcher.with_chain_id(chain_id);
        }

        let mut scheduler = Scheduler::new(Arc::new(dispatcher));
        scheduler.start(plan.interval, plan.cycles)?;

        println!("Sending... (Press Ctrl+C to stop)\n");

        let interrupted = tokio::select! {
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("cannot listen for Ctrl+C: {}", e);
                    false
                }
            },
            _ = scheduler.wait() => false,
        };

        if interrupted {
            println!("\nStopping after the current cycle...");
            scheduler.stop();
        }
        let cycles = scheduler.wait().await;

        println!("\n--- Final Statistics ---");
        println!("Cycles completed:        {}", cycles);
        println!(
            "Successful transactions: {}",
            scheduler.dispatcher().success_count()
        );
        println!("Log lines kept:          {}", log.len());

        Ok::<(), Box<dyn Error>>(())
    })
}

fn run_vanity(search: VanitySearch) -> Result<(), Box<dyn Error>> {
    let log = Arc::new(LogBuffer::new());

    // Print startup info
    println!("Ethereum Vanity Address Generator");
    println!("==================================");
    println!(
        "Pattern:    {} ({})",
        if search.pattern.is_any() { "<any>" } else { search.pattern.pattern() },
        search.pattern.pattern_type()
    );
    println!("Difficulty: {}", search.pattern.difficulty_description());
    println!("Workers:    {}", search.threads);
    println!("Target:     {} address(es)", search.target);
    println!();

    let pool = WorkerPool::start(search.pattern, search.threads, search.target, log)?;

    // Set up ctrl-c handler
    ctrlc_handler(pool.stop_flag_clone());

    println!("Searching... (Press Ctrl+C to stop)\n");

    let mut found = 0;

    loop {
        // Wait for result or timeout for progress report
        match pool.wait_for_result(search.report_interval) {
            Some(result) => {
                found += 1;
                print_result(&result, found);

                if found >= pool.target() {
                    println!("\nTarget reached! Found {} address(es).", found);
                    break;
                }
            }
            None => {
                // Timeout - print progress
                print_progress(&pool);
            }
        }

        // Check if we should stop (ctrl-c was pressed)
        if pool.is_stopped() && !pool.is_complete() {
            while let Some(result) = pool.try_recv() {
                found += 1;
                print_result(&result, found);
            }
            println!("\nStopped by user.");
            break;
        }
    }

    // Print final stats
    println!("\n--- Final Statistics ---");
    println!("Total keys generated: {}", format_number(pool.total_keys()));
    println!("Total matches found:  {}", pool.total_matches());
    println!("Time elapsed:         {:.2}s", pool.elapsed().as_secs_f64());
    println!(
        "Average speed:        {}/s",
        format_number(pool.keys_per_second() as u64)
    );

    pool.join();
    Ok(())
}

fn print_result(result: &VanityResult, index: usize) {
    println!("=== Match #{} ===", index);
    println!("Address:     {}", result.address());
    println!("Private Key: {}", result.private_key());
    println!("Worker:      {}", result.worker_id);
    println!();
}

fn print_progress(pool: &WorkerPool) {
    let keys = pool.total_keys();
    let rate = pool.keys_per_second();
    let elapsed = pool.elapsed().as_secs();

    println!(
        "[{:>4}s] Generated {} keys ({}/s), {}/{} found",
        elapsed,
        format_number(keys),
        format_number(rate as u64),
        pool.total_matches(),
        pool.target()
    );
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(stop_flag: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Relaxed);
    }) {
        log::warn!("Error setting Ctrl-C handler: {}", e);
    }
}

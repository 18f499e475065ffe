// SPDX-License-Identifier: Apache-2.0

//! Run ICAO test case 7816_A_1 against a document on a PC/SC reader
//!
//! This example shows how to:
//! 1. Load the test configuration (first argument or `ICAO_TEST_CONFIG`)
//! 2. Pick a contactless reader (`ICAO_READER`, otherwise the first one)
//! 3. Wait for the document and select the eMRTD application
//! 4. Cancel the run with Ctrl-C

use std::env;
use std::error::Error;
use std::sync::Arc;

use icao_test_app::{TestConfig, TestController};
use nfc_transport_pcsc::{PcscConfig, TransportNativePcsc};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let config = match env::args().nth(1).or_else(|| env::var("ICAO_TEST_CONFIG").ok()) {
        Some(path) => {
            println!("📄 Loading configuration from {}", path);
            TestConfig::from_json_file(&path)?
        }
        None => TestConfig::default(),
    };

    let mut pcsc_config = PcscConfig::default();
    if let Ok(reader) = env::var("ICAO_READER") {
        pcsc_config = pcsc_config.with_reader(reader);
    }

    let platform = Arc::new(TransportNativePcsc::new(pcsc_config));
    let controller = Arc::new(
        TestController::for_platform(platform.clone(), config)
            .with_listener(|state| log::debug!("state: {:?}", state)),
    );

    println!("🔌 Starting the NFC stack...");
    if let Err(e) = controller.start_platform().await {
        eprintln!("❌ {}", e.user_message());
        return Ok(());
    }

    match platform.list_readers() {
        Ok(readers) if !readers.is_empty() => {
            println!("✅ Found {} reader(s)", readers.len());
            for reader in &readers {
                println!("  - {}", reader);
            }
        }
        Ok(_) => {
            eprintln!("❌ No PC/SC reader found");
            eprintln!("Please ensure:");
            eprintln!("  1. A contactless reader is connected");
            eprintln!("  2. The PC/SC daemon is running");
            return Ok(());
        }
        Err(e) => {
            eprintln!("❌ Cannot list readers: {}", e);
            return Ok(());
        }
    }

    println!("\n📇 {}", controller.config().waiting_prompt);
    println!("   (Ctrl-C to cancel)");

    let mut run = tokio::spawn({
        let controller = controller.clone();
        async move { controller.start_test().await }
    });

    tokio::select! {
        joined = &mut run => match joined? {
            Ok(outcome) => {
                println!("\n🔗 {} card {}", outcome.technology, hex::encode(&outcome.card_identifier));
                println!("  Response: {}", outcome.rendered_response);
                if let Some(sw) = outcome.status_word {
                    println!("  Status: {} ({})", sw, sw.description());
                }
                if outcome.success {
                    println!("✅ Test 7816_A_1 passed");
                } else {
                    println!("❌ Test 7816_A_1 failed");
                }
            }
            Err(e) => eprintln!("\n❌ {}", e.user_message()),
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\n⏹️  Cancelling...");
            controller.cancel().await;
            if let Ok(Err(e)) = run.await {
                log::info!("run ended: {}", e);
            }
        }
    }

    controller.teardown().await;

    println!("\n📋 Final state:");
    println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);

    Ok(())
}

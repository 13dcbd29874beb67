use crate::acquisition::{Acquisition, NextTransfer, SampleSink};
use crate::constants::{ENDPOINT_COMMAND_OUT, ENDPOINT_DATA_IN, PID, VID};
use crate::error::H4032LError;
use crate::scheduler::{CompletionStatus, TransferScheduler, UsbScheduler};
use crate::transforms;
use crate::trigger::{TriggerMatch, TriggerStage, TRIGGER_MATCHES, apply_trigger_stages};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use zerocopy::byteorder::little_endian::{U16, U32};

/// Lifecycle state of the opened device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceState {
    Active,
    Inactive,
}

/// Requests early termination of an in-flight acquisition.
///
/// Stopping cancels the in-flight transfer (by dropping its future,
/// which cancels the underlying USB transfer) and forces the state
/// machine to idle without waiting for further completions. A stop
/// issued while no acquisition is running does not affect later runs.
#[derive(Debug, Clone)]
pub struct StopHandle {
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.notify.notify_one();
    }
}

/// Represents a connection to a Hantek 4032L logic analyzer.
pub struct H4032L {
    scheduler: UsbScheduler,
    acquisition: Acquisition,
    trigger_stages: Vec<TriggerStage>,
    state: DeviceState,
    stop: Arc<Notify>,
}

impl H4032L {
    /// Create a new H4032L instance by finding and connecting to the device.
    pub async fn new() -> Result<Self, H4032LError> {
        info!("Searching for Hantek 4032L...");
        let device_info = nusb::list_devices()?
            .find(|d| d.vendor_id() == VID && d.product_id() == PID)
            .ok_or(H4032LError::DeviceNotFound)?;

        info!(
            "Found device on bus {} addr {}",
            device_info.bus_number(),
            device_info.device_address()
        );

        let device = device_info.open()?;
        let interface = device.detach_and_claim_interface(0)?;
        info!("Interface claimed successfully.");

        Ok(Self {
            scheduler: UsbScheduler::new(interface),
            acquisition: Acquisition::new(),
            trigger_stages: Vec::new(),
            state: DeviceState::Active,
            stop: Arc::new(Notify::new()),
        })
    }

    /// Mark the device inactive; a subsequent `acquire` fails with
    /// `DeviceNotReady` until it is reopened.
    pub fn close(&mut self) {
        self.state = DeviceState::Inactive;
    }

    /// The supported sample rates in ascending order.
    pub fn supported_sample_rates() -> &'static [u64] {
        &transforms::SAMPLE_RATES_SORTED
    }

    /// The supported trigger match kinds.
    pub fn trigger_matches() -> &'static [TriggerMatch] {
        &TRIGGER_MATCHES
    }

    /// Select a sample rate by its exact value in Hz.
    pub fn set_sample_rate(&mut self, rate_hz: u64) -> Result<(), H4032LError> {
        let index = transforms::sample_rate_index(rate_hz)?;
        self.acquisition.command_packet_mut().sample_rate = index;
        Ok(())
    }

    /// The currently selected sample rate in Hz.
    pub fn sample_rate(&self) -> u64 {
        transforms::sample_rate_hz(self.acquisition.command_packet().sample_rate).unwrap_or(0)
    }

    /// Fraction of the sample depth captured before the trigger point,
    /// as an integer percentage 0..=100.
    pub fn set_capture_ratio(&mut self, ratio: u64) -> Result<(), H4032LError> {
        self.acquisition.set_capture_ratio(ratio)
    }

    pub fn capture_ratio(&self) -> u64 {
        self.acquisition.capture_ratio()
    }

    /// Set the per-channel sample depth, rounded up to the next
    /// multiple of 512 and bounded to 2 Ki ... 64 Mi.
    pub fn set_sample_count(&mut self, samples: u64) -> Result<(), H4032LError> {
        let rounded = transforms::round_sample_size(samples)?;
        self.acquisition.command_packet_mut().sample_size = U32::new(rounded);
        Ok(())
    }

    pub fn sample_count(&self) -> u32 {
        self.acquisition.command_packet().sample_size.get()
    }

    /// Program the comparator thresholds of channel groups A and B.
    pub fn set_threshold_voltages(&mut self, group_a_volts: f64, group_b_volts: f64) {
        let packet = self.acquisition.command_packet_mut();
        packet.pwm_a = U16::new(transforms::voltage_to_pwm(group_a_volts));
        packet.pwm_b = U16::new(transforms::voltage_to_pwm(group_b_volts));
    }

    /// Supply the trigger specification for subsequent runs. Built
    /// into the command packet when an acquisition starts; an empty
    /// slice disables triggering.
    pub fn set_trigger(&mut self, stages: Vec<TriggerStage>) {
        self.trigger_stages = stages;
    }

    /// A handle that can stop an in-flight acquisition from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            notify: Arc::clone(&self.stop),
        }
    }

    /// Run one acquisition to completion, streaming sample batches
    /// into `sink`. Returns once the end-of-stream marker was emitted,
    /// the run was stopped, or a protocol/transport failure aborted it.
    pub async fn acquire(&mut self, sink: &mut dyn SampleSink) -> Result<(), H4032LError> {
        if self.state != DeviceState::Active {
            return Err(H4032LError::DeviceNotReady);
        }

        apply_trigger_stages(self.acquisition.command_packet_mut(), &self.trigger_stages)?;

        let stop = Arc::clone(&self.stop);
        run_acquisition_until_stopped(&mut self.scheduler, &mut self.acquisition, sink, &stop)
            .await
    }
}

/// Race one run against the stop notifier. A stop requested while no
/// run was in flight is discarded, not carried into this run.
pub async fn run_acquisition_until_stopped<S: TransferScheduler>(
    scheduler: &mut S,
    acquisition: &mut Acquisition,
    sink: &mut dyn SampleSink,
    stop: &Notify,
) -> Result<(), H4032LError> {
    // A stop issued while idle leaves a stored permit behind; consume
    // it so it cannot abort this run at its first poll.
    tokio::select! {
        biased;
        _ = stop.notified() => {}
        _ = std::future::ready(()) => {}
    }

    let run = run_acquisition(scheduler, acquisition, sink);
    tokio::select! {
        result = run => result,
        _ = stop.notified() => {
            info!("acquisition stopped by request");
            acquisition.abort();
            Ok(())
        }
    }
}

/// Drive the state machine through a scheduler until it goes idle.
///
/// Exactly one transfer is in flight at any time. A submission
/// rejected by the scheduler aborts the run to idle; protocol-level
/// "not ready" responses are the only automatic retries.
pub async fn run_acquisition<S: TransferScheduler>(
    scheduler: &mut S,
    acquisition: &mut Acquisition,
    sink: &mut dyn SampleSink,
) -> Result<(), H4032LError> {
    let mut next = acquisition.start();
    loop {
        match next {
            NextTransfer::CommandOut(data) => {
                match scheduler.bulk_out(ENDPOINT_COMMAND_OUT, data).await {
                    Ok(_) => {
                        next = acquisition.handle_completion(
                            CompletionStatus::Completed,
                            &[],
                            sink,
                        )?;
                    }
                    Err(error) => {
                        error!(%error, "failed to submit command transfer");
                        acquisition.abort();
                        return Err(error);
                    }
                }
            }
            NextTransfer::PollIn(len) => match scheduler.bulk_in(ENDPOINT_DATA_IN, len).await {
                Ok(data) => {
                    next = acquisition.handle_completion(
                        CompletionStatus::Completed,
                        &data,
                        sink,
                    )?;
                }
                Err(error) => {
                    error!(%error, "failed to submit poll transfer");
                    acquisition.abort();
                    return Err(error);
                }
            },
            NextTransfer::Idle => return Ok(()),
        }
    }
}

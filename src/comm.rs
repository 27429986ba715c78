// MIT License - Copyright (c) 2026 Peter Wright
// Session with the ETHM module: initialisation, queries and commands

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::config::SatelConfig;
use crate::error::{Result, SatelError};
use crate::event::{EventSender, SatelEvent};
use crate::protocol::{
    DeviceKind, DeviceName, Message, PanelVersion, ReadCommand, Request, monitored_reports,
    parse_panel_time,
};
use crate::state::SharedState;
use crate::transport::SatelConnection;

/// One connection to the module and everything done over it.
///
/// A session is created per connection and dropped when the connection is
/// lost; [`crate::AsyncSatel`] owns the reconnect logic.
pub struct SatelComm {
    connection: SatelConnection,
    state: SharedState,
    event_tx: EventSender,
    config: SatelConfig,
}

impl SatelComm {
    /// Connect and bring the session up: names, monitoring and a full refresh.
    pub async fn open(config: &SatelConfig, state: SharedState, event_tx: EventSender) -> Result<Self> {
        let connection = SatelConnection::open(config, state.clone(), event_tx.clone()).await?;
        let comm = Self {
            connection,
            state,
            event_tx,
            config: config.clone(),
        };

        if comm.config.read_names {
            comm.read_names().await;
        }
        if comm.config.enable_monitoring {
            comm.start_monitoring().await?;
        }
        comm.refresh().await?;

        info!("Satel session ready");
        Ok(comm)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Resolves once the connection is lost or closed.
    pub async fn closed(&self) {
        self.connection.closed().await
    }

    pub async fn close(&self) {
        self.connection.close().await
    }

    /// Send a request and return the raw reply.
    pub async fn request(&self, request: &Request) -> Result<Message> {
        self.connection.request(request).await
    }

    /// Send a query and return the reply carrying `command`.
    async fn query(&self, request: &Request, command: ReadCommand) -> Result<Message> {
        let reply = self.request(request).await?;
        if reply.command == command {
            return Ok(reply);
        }
        match reply.result_code() {
            Some(code) => Err(SatelError::Rejected(code)),
            None => Err(SatelError::InvalidResponse {
                details: format!("expected {}, got {}", command, reply.command),
            }),
        }
    }

    /// Send a write command and check its result code.
    pub async fn execute(&self, request: &Request) -> Result<()> {
        let reply = self.request(request).await?;
        match reply.result_code() {
            Some(code) if code.is_success() => {
                debug!("{} accepted ({})", request.command, code);
                Ok(())
            }
            Some(code) => {
                warn!("{} rejected: {}", request.command, code);
                Err(SatelError::Rejected(code))
            }
            None => Err(SatelError::InvalidResponse {
                details: format!("expected result for {}, got {}", request.command, reply.command),
            }),
        }
    }

    /// Ask the module to push every monitored report on change.
    pub async fn start_monitoring(&self) -> Result<()> {
        let request = Request::start_monitoring(&monitored_reports())?;
        let reply = self.request(&request).await?;
        if reply.command != ReadCommand::Result || reply.data != [0xFF] {
            warn!("Monitoring not accepted: {:02X?}", reply.data);
            return Err(SatelError::MonitoringRejected);
        }
        info!("Monitoring started");
        let _ = self.event_tx.send(SatelEvent::MonitoringStarted);
        Ok(())
    }

    /// Query every monitored report.
    pub async fn refresh(&self) -> Result<()> {
        self.query_reports(&monitored_reports()).await
    }

    /// Query the reports not yet received on this connection.
    pub async fn refresh_missing(&self) -> Result<usize> {
        let missing = self.state.read().await.missing_reports(&monitored_reports());
        self.query_reports(&missing).await?;
        Ok(missing.len())
    }

    async fn query_reports(&self, reports: &[ReadCommand]) -> Result<()> {
        for &report in reports {
            match self.query(&Request::query(report), report).await {
                Ok(_) => {}
                // Older firmware does not know every report
                Err(SatelError::Rejected(code)) => {
                    warn!("Panel rejected {} query: {}", report, code);
                    let events = self.state.write().await.mark_unsupported(report);
                    for event in events {
                        let _ = self.event_tx.send(event);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Keep the module from dropping an idle session.
    ///
    /// Missing reports are queried first; when nothing is missing a cheap
    /// name read stands in. Any answer from the module keeps the session,
    /// including a result code refusing the name read.
    pub async fn keep_alive(&self) -> Result<()> {
        if self.refresh_missing().await? > 0 {
            return Ok(());
        }
        match self
            .query(&Request::keep_alive(), ReadCommand::ReadDeviceName)
            .await
        {
            Ok(_) => Ok(()),
            Err(SatelError::Rejected(code)) => {
                debug!("Keep-alive answered with {}", code);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn read_device_name(&self, kind: DeviceKind, number: u32) -> Result<DeviceName> {
        let max = kind.max_number();
        if number == 0 || number > max {
            return Err(SatelError::InvalidDeviceId { id: number, max });
        }
        let reply = self
            .query(&Request::device_name(kind, number), ReadCommand::ReadDeviceName)
            .await?;
        let name = DeviceName::parse(&reply.data)?;
        self.state
            .write()
            .await
            .set_name(kind, name.number, name.name.clone());
        Ok(name)
    }

    /// Read the names of all monitored devices. Failures are logged and skipped.
    async fn read_names(&self) {
        let devices = self
            .config
            .monitored_zones
            .iter()
            .map(|&id| (DeviceKind::Zone, id))
            .chain(self.config.monitored_outputs.iter().map(|&id| (DeviceKind::Output, id)))
            .chain(self.config.partitions.iter().map(|&id| (DeviceKind::Partition, id)));

        for (kind, id) in devices {
            match self.read_device_name(kind, id).await {
                Ok(name) => debug!("{:?} {}: {}", kind, id, name.name),
                Err(e) => warn!("Cannot read name of {:?} {}: {}", kind, id, e),
            }
        }
    }

    pub async fn read_version(&self) -> Result<PanelVersion> {
        let reply = self
            .query(&Request::query(ReadCommand::ReadVersion), ReadCommand::ReadVersion)
            .await?;
        PanelVersion::parse(&reply.data)
    }

    pub async fn read_time(&self) -> Result<NaiveDateTime> {
        let reply = self
            .query(&Request::query(ReadCommand::ReadTime), ReadCommand::ReadTime)
            .await?;
        parse_panel_time(&reply.data)
    }
}

use crate::membership::ServerId;
use crate::replica::PortLayout;
use crate::transport::RetryPolicy;
use std::convert::TryFrom;
use std::net::{IpAddr, Ipv4Addr};
use tokio::time::Duration;

#[derive(Clone, Debug, Default)]
pub struct ReplicaOptions {
    pub host: Option<IpAddr>,
    pub master_command_port: Option<u16>,
    pub bootstrap_port: Option<u16>,
    /// Followers listen on this plus their id.
    pub follower_port_base: Option<u16>,
    /// Id the first master takes when nobody answers on the bootstrap port.
    pub master_id: Option<u32>,
    pub ping_interval: Option<Duration>,
    pub follower_accept_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub dial_attempts: Option<u32>,
    pub rebootstrap_min_delay: Option<Duration>,
    pub rebootstrap_max_delay: Option<Duration>,
}

#[derive(Clone, Debug)]
pub(crate) struct ReplicaOptionsValidated {
    pub ports: PortLayout,
    pub master_id: ServerId,
    pub ping_interval: Duration,
    pub follower_accept_timeout: Duration,
    pub connect_timeout: Duration,
    pub dial_attempts: u32,
    pub rebootstrap_min_delay: Duration,
    pub rebootstrap_max_delay: Duration,
}

impl ReplicaOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.master_id.as_u32() == 0 {
            return Err("Master id must be at least 1");
        }
        if self.ping_interval >= self.follower_accept_timeout {
            return Err("Follower accept timeout must be greater than the master's ping interval");
        }
        if self.dial_attempts == 0 {
            return Err("Dial attempts must be at least 1");
        }
        match self.connect_timeout.checked_mul(self.dial_attempts) {
            Some(all_attempts) if all_attempts < self.ping_interval => {}
            _ => return Err("All dial attempts to one peer must fit within the ping interval"),
        }
        if self.ports.master_command_port == self.ports.bootstrap_port {
            return Err("Master command port and bootstrap port must differ");
        }
        if self.rebootstrap_min_delay > self.rebootstrap_max_delay {
            return Err("Re-bootstrap minimum delay must not exceed the maximum delay");
        }
        if self.ports.follower_port(self.master_id).is_none() {
            return Err("Follower port base leaves no room for follower ports");
        }

        Ok(())
    }

    pub(crate) fn dial_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.dial_attempts, self.connect_timeout)
    }
}

impl TryFrom<ReplicaOptions> for ReplicaOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ReplicaOptions) -> Result<Self, Self::Error> {
        let values = ReplicaOptionsValidated {
            ports: PortLayout {
                host: options.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                master_command_port: options.master_command_port.unwrap_or(5000),
                bootstrap_port: options.bootstrap_port.unwrap_or(4000),
                follower_port_base: options.follower_port_base.unwrap_or(5100),
            },
            master_id: ServerId::new(options.master_id.unwrap_or(1)),
            ping_interval: options.ping_interval.unwrap_or(Duration::from_secs(1)),
            follower_accept_timeout: options.follower_accept_timeout.unwrap_or(Duration::from_secs(3)),
            connect_timeout: options.connect_timeout.unwrap_or(Duration::from_millis(250)),
            dial_attempts: options.dial_attempts.unwrap_or(2),
            rebootstrap_min_delay: options.rebootstrap_min_delay.unwrap_or(Duration::from_millis(200)),
            rebootstrap_max_delay: options.rebootstrap_max_delay.unwrap_or(Duration::from_secs(1)),
        };

        values.validate()?;
        Ok(values)
    }
}

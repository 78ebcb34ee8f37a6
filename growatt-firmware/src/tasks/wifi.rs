// WiFi Task - Verbindet mit WLAN (primär/Ausweich) und meldet die Signalstärke
use defmt::{Debug2Format, error, info, warn};
use embassy_net::{Config as NetConfig, Ipv4Address, Ipv4Cidr, Runner, Stack, StaticConfigV4};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, ScanConfig, WifiController, WifiDevice};

use growatt_core::settings::WifiCredentials;

use crate::config::{SETTINGS, WIFI_RETRY_DELAY_SECS};
use crate::{WifiLink, WifiLinkSignal};

/// Netzwerk-Konfiguration für embassy-net
///
/// DHCP, außer `SETTINGS.network.static_ip` ist gesetzt.
pub fn net_config() -> NetConfig {
    let Some(ip) = SETTINGS.network.static_ip else {
        return NetConfig::dhcpv4(Default::default());
    };

    let prefix = u32::from_be_bytes(ip.subnet).count_ones() as u8;
    let mut config = StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::from(ip.address), prefix),
        gateway: Some(Ipv4Address::from(ip.gateway)),
        dns_servers: Default::default(),
    };
    for dns in [ip.primary_dns, ip.secondary_dns] {
        if dns != [0, 0, 0, 0] {
            let _ = config.dns_servers.push(Ipv4Address::from(dns));
        }
    }
    NetConfig::ipv4_static(config)
}

/// WiFi Connection Task
///
/// Managed die WiFi-Verbindung:
/// - Versucht abwechselnd das primäre und das Ausweich-Netz
/// - Meldet SSID und RSSI nach dem Verbinden an den Control-Loop
/// - Überwacht Verbindung und reconnected bei Bedarf
#[embassy_executor::task]
pub async fn connection_task(
    mut controller: WifiController<'static>,
    link_signal: &'static WifiLinkSignal,
) {
    info!("WiFi: Starting connection task");

    let networks = [SETTINGS.network.primary, SETTINGS.network.backup];
    let mut attempt = 0usize;

    loop {
        let credentials = networks[attempt % networks.len()];

        match connect(&mut controller, credentials).await {
            Ok(rssi) => {
                attempt = 0;
                link_signal.signal(WifiLink {
                    ssid: credentials.ssid,
                    rssi,
                });

                // Wait for disconnect
                controller
                    .wait_for_event(esp_radio::wifi::WifiEvent::StaDisconnected)
                    .await;
                warn!("WiFi: Disconnected from '{}', will retry...", credentials.ssid);
                link_signal.signal(WifiLink { ssid: "", rssi: 0 });
                Timer::after(Duration::from_secs(2)).await;
            }
            Err(()) => {
                attempt = attempt.wrapping_add(1);
                // Controller stoppen, damit die nächste Konfiguration greift
                if let Err(e) = controller.stop_async().await {
                    warn!("WiFi: Stop failed: {}", Debug2Format(&e));
                }
                Timer::after(Duration::from_secs(WIFI_RETRY_DELAY_SECS)).await;
            }
        }
    }
}

/// Ein Verbindungsversuch mit einem Zugangsdaten-Paar
///
/// Liefert die Signalstärke des Access Points (0 wenn der Scan ihn nicht sieht).
async fn connect(
    controller: &mut WifiController<'static>,
    credentials: WifiCredentials,
) -> Result<i8, ()> {
    if matches!(controller.is_started(), Ok(true)) {
        // Läuft noch mit alter Konfiguration
        let _ = controller.stop_async().await;
    }

    info!("WiFi: Configuring for '{}'...", credentials.ssid);
    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(credentials.ssid.into())
            .with_password(credentials.password.into()),
    );

    if let Err(e) = controller.set_config(&client_config) {
        error!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
        return Err(());
    }

    if let Err(e) = controller.start_async().await {
        error!("WiFi: Failed to start: {}", Debug2Format(&e));
        return Err(());
    }

    let mut rssi = 0;
    match controller
        .scan_with_config_async(ScanConfig::default())
        .await
    {
        Ok(ap_infos) => {
            if let Some(ap) = ap_infos
                .iter()
                .find(|ap| ap.ssid.as_str() == credentials.ssid)
            {
                rssi = ap.signal_strength;
                info!("WiFi: '{}' found, Signal: {} dBm", credentials.ssid, rssi);
            } else {
                warn!("WiFi: '{}' not in scan ({} APs)", credentials.ssid, ap_infos.len());
            }
        }
        Err(e) => warn!("WiFi: Scan failed: {}", Debug2Format(&e)),
    }

    info!("WiFi: Connecting to '{}'...", credentials.ssid);
    match controller.connect_async().await {
        Ok(_) => {
            info!("WiFi: Connected successfully!");
            Ok(rssi)
        }
        Err(e) => {
            error!("WiFi: Connection failed: {}", Debug2Format(&e));
            Err(())
        }
    }
}

/// Network Task
///
/// Prozessiert Netzwerk-Pakete für den TCP/IP Stack
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// Adress-Monitor Task
///
/// Wartet auf Link und IPv4-Konfiguration (DHCP oder statisch) und loggt sie
#[embassy_executor::task]
pub async fn dhcp_task(stack: &'static Stack<'static>) {
    stack.wait_link_up().await;
    let source = if SETTINGS.network.static_ip.is_some() {
        "static"
    } else {
        "DHCP"
    };
    info!("WiFi: Link is up, waiting for {} address...", source);

    stack.wait_config_up().await;
    if let Some(config) = stack.config_v4() {
        info!("WiFi: Address ready ({})", source);
        info!("  IP:      {}", Debug2Format(&config.address));
        info!("  Gateway: {}", Debug2Format(&config.gateway));
        info!("  DNS:     {}", Debug2Format(&config.dns_servers));
    }
}

// MQTT Task - Published Status- und Discovery-Nachrichten, empfängt Set-Kommandos
use defmt::{Debug2Format, error, info, warn};
use embassy_futures::select::{Either3, select3};
use embassy_net::{IpAddress, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_time::{Duration, Timer, with_timeout};
use heapless::{String, Vec};

use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;

use growatt_core::command::command_filter;
use growatt_core::payload::{StatusSensor, status_discovery_payload, status_discovery_topic};
use growatt_core::state::CLIENT_ID_CAPACITY;
use growatt_core::version::BUILD_VERSION;

use crate::config::*;
use crate::{CommandSender, Incoming, Outgoing, OutgoingReceiver};

/// Was die Publish-Schleife als Nächstes tut
///
/// Empfangene Daten werden kopiert, damit der Client wieder frei ist.
enum Event {
    Command(Option<Incoming>),
    Publish(Outgoing),
    Ping,
}

/// MQTT Task - läuft parallel zum Control-Loop
///
/// Dieser Task übernimmt das MQTT-Publishing:
/// - Wartet auf Netzwerk-Verbindung
/// - Verbindet sich mit Client-ID, Benutzer und Passwort
/// - Published einmal pro Verbindung die Home Assistant Discovery
/// - Abonniert `<root>/write/+` und reicht Set-Kommandos an den Control-Loop
/// - Leitet Nachrichten aus dem Control-Loop weiter
/// - Automatisches Reconnect bei Fehlern
///
/// # Parameter
/// - `stack`: embassy-net Stack für Netzwerk-Zugriff
/// - `client_id`: zur Laufzeit gebaute Client-ID (Kopie aus dem Zustand)
/// - `outgoing`: Receiver für fertige Nachrichten
/// - `commands`: Sender für empfangene Set-Kommandos
#[embassy_executor::task]
pub async fn mqtt_task(
    stack: &'static Stack<'static>,
    client_id: String<CLIENT_ID_CAPACITY>,
    outgoing: OutgoingReceiver,
    commands: CommandSender,
) {
    info!("MQTT: Task started, waiting for network...");
    wait_for_network(stack).await;
    info!("MQTT: Network ready");

    loop {
        match mqtt_connect_and_publish(stack, &client_id, &outgoing, &commands).await {
            Ok(_) => warn!("MQTT: Connection closed normally"),
            Err(e) => error!("MQTT: Error: {}", e),
        }
        info!("MQTT: Reconnecting in {}s...", MQTT_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MQTT_RECONNECT_DELAY_SECS)).await;
    }
}

/// Wartet bis Netzwerk-Verbindung verfügbar ist
///
/// Prüft kontinuierlich Link-Status und DHCP-Konfiguration.
async fn wait_for_network(stack: &'static Stack<'static>) {
    loop {
        if stack.is_link_up() && stack.config_v4().is_some() {
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Verbindet mit dem MQTT Broker und published bis zum ersten Fehler
///
/// 1. DNS-Auflösung des Broker-Hostnames
/// 2. TCP-Verbindung aufbauen
/// 3. MQTT CONNECT mit Zugangsdaten
/// 4. Discovery-Konfiguration für die Status-Sensoren
/// 5. SUBSCRIBE auf die Set-Kommandos
/// 6. Nachrichten weiterleiten und empfangen, dazwischen Pings
async fn mqtt_connect_and_publish(
    stack: &'static Stack<'static>,
    client_id: &str,
    outgoing: &OutgoingReceiver,
    commands: &CommandSender,
) -> Result<(), MqttError> {
    // DNS Lookup
    info!("MQTT: Resolving '{}'...", MQTT_SERVER);
    let broker_ip = resolve_hostname(stack, MQTT_SERVER).await?;
    info!("MQTT: Resolved to {}", Debug2Format(&broker_ip));

    // TCP Connect
    let mut rx_buffer = [0u8; 4096];
    let mut tx_buffer = [0u8; 4096];
    let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(10)));

    socket
        .connect((broker_ip, SETTINGS.mqtt.port))
        .await
        .map_err(|_| MqttError::ConnectionFailed)?;
    info!("MQTT: TCP connected");

    // MQTT Client Configuration
    let rng = CountingRng(20000);
    let mut config = ClientConfig::<5, _>::new(MqttVersion::MQTTv5, rng);
    config.add_client_id(client_id);
    if !SETTINGS.mqtt.user.is_empty() {
        config.add_username(SETTINGS.mqtt.user);
        config.add_password(SETTINGS.mqtt.password);
    }
    config.keep_alive = MQTT_KEEP_ALIVE_SECS;
    config.max_packet_size = MQTT_BUFFER_SIZE as u32;

    // MQTT Buffer
    let mut send_buffer = [0u8; MQTT_BUFFER_SIZE];
    let mut recv_buffer = [0u8; MQTT_BUFFER_SIZE];

    let mut client = MqttClient::<_, 5, _>::new(
        socket,
        &mut send_buffer,
        MQTT_BUFFER_SIZE,
        &mut recv_buffer,
        MQTT_BUFFER_SIZE,
        config,
    );

    // MQTT CONNECT
    client
        .connect_to_broker()
        .await
        .map_err(|_| MqttError::ProtocolError)?;
    info!("MQTT: Connected to broker as '{}'", client_id);

    // Home Assistant Discovery (retained), nur für Werte die das Gerät selbst liefert
    let mut payload = [0u8; MQTT_BUFFER_SIZE / 2];
    for sensor in StatusSensor::ALL {
        let topic = status_discovery_topic(client_id, sensor)
            .map_err(|_| MqttError::PayloadTooLarge)?;
        let len = status_discovery_payload(
            SETTINGS.mqtt.topic_root,
            client_id,
            BUILD_VERSION,
            sensor,
            &mut payload,
        )
        .map_err(|_| MqttError::PayloadTooLarge)?;

        client
            .send_message(&topic, &payload[..len], QualityOfService::QoS0, true)
            .await
            .map_err(|_| MqttError::PublishFailed)?;
    }
    info!("MQTT: Discovery published");

    // Set-Kommandos
    let filter = command_filter(SETTINGS.mqtt.topic_root).map_err(|_| MqttError::PayloadTooLarge)?;
    client
        .subscribe_to_topic(&filter)
        .await
        .map_err(|_| MqttError::SubscribeFailed)?;
    info!("MQTT: Subscribed to '{}'", filter.as_str());

    // Publish Loop - wartet auf Nachrichten in beide Richtungen, pingt bei Leerlauf
    let ping_interval = Duration::from_secs(MQTT_KEEP_ALIVE_SECS as u64 / 2);
    loop {
        let event = match select3(
            client.receive_message(),
            outgoing.receive(),
            Timer::after(ping_interval),
        )
        .await
        {
            Either3::First(received) => {
                let (topic, data) = received.map_err(|_| MqttError::ProtocolError)?;
                Event::Command(copy_command(topic, data))
            }
            Either3::Second(msg) => Event::Publish(msg),
            Either3::Third(_) => Event::Ping,
        };

        match event {
            Event::Command(Some(command)) => {
                if commands.try_send(command).is_err() {
                    warn!("MQTT: Command queue full, dropping command");
                }
            }
            Event::Command(None) => warn!("MQTT: Oversized command dropped"),
            Event::Publish(msg) => {
                client
                    .send_message(
                        &msg.topic,
                        msg.payload.as_bytes(),
                        QualityOfService::QoS0,
                        false,
                    )
                    .await
                    .map_err(|_| MqttError::PublishFailed)?;

                if SETTINGS.debug.mqtt {
                    let len = msg.payload.len();
                    info!("MQTT: Published {} bytes to '{}'", len, msg.topic.as_str());
                }
            }
            Event::Ping => {
                client
                    .send_ping()
                    .await
                    .map_err(|_| MqttError::ProtocolError)?;
            }
        }
    }
}

/// Kopiert ein empfangenes Kommando aus dem Client-Puffer
///
/// `None` wenn Topic oder Payload nicht in die Puffer passen.
fn copy_command(topic: &str, data: &[u8]) -> Option<Incoming> {
    let mut copied: String<_> = String::new();
    copied.push_str(topic).ok()?;
    Some(Incoming {
        topic: copied,
        payload: Vec::from_slice(data).ok()?,
    })
}

/// Löst Hostname zu IPv4-Adresse auf
///
/// Nutzt embassy-net DNS-Stack mit konfigurierbarem Timeout.
async fn resolve_hostname(
    stack: &'static Stack<'static>,
    hostname: &str,
) -> Result<embassy_net::Ipv4Address, MqttError> {
    let result = with_timeout(
        Duration::from_secs(DNS_TIMEOUT_SECS),
        stack.dns_query(hostname, DnsQueryType::A),
    )
    .await;

    match result {
        Ok(Ok(addrs)) => {
            for addr in addrs {
                if let IpAddress::Ipv4(ipv4) = addr {
                    return Ok(ipv4);
                }
            }
            Err(MqttError::DnsResolutionFailed)
        }
        Ok(Err(_)) => Err(MqttError::DnsResolutionFailed),
        Err(_) => Err(MqttError::DnsTimeout),
    }
}

/// MQTT Fehler-Typen
///
/// Alle möglichen Fehler die während MQTT-Operationen auftreten können.
#[derive(Debug)]
enum MqttError {
    DnsResolutionFailed,
    DnsTimeout,
    ConnectionFailed,
    ProtocolError,
    PublishFailed,
    SubscribeFailed,
    PayloadTooLarge,
}

impl defmt::Format for MqttError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MqttError::DnsResolutionFailed => defmt::write!(fmt, "DNS failed"),
            MqttError::DnsTimeout => defmt::write!(fmt, "DNS timeout"),
            MqttError::ConnectionFailed => defmt::write!(fmt, "Connection failed"),
            MqttError::ProtocolError => defmt::write!(fmt, "Protocol error"),
            MqttError::PublishFailed => defmt::write!(fmt, "Publish failed"),
            MqttError::SubscribeFailed => defmt::write!(fmt, "Subscribe failed"),
            MqttError::PayloadTooLarge => defmt::write!(fmt, "Payload too large"),
        }
    }
}

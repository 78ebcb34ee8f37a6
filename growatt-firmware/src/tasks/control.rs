// Control-Loop - besitzt den Laufzeit-Zustand und pollt die Software-Timer
use defmt::{error, info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};
use esp_hal_smartled::smart_led_buffer;

use growatt_core::command::parse_set_command;
use growatt_core::field::{Message, Msg, MqttStat};
use growatt_core::payload::{LinkInfo, Topic, write_command_ack, write_status, write_summary};
use growatt_core::{StatusColor, StatusIndicator, TimerSlot};

use crate::config::{CONTROL_LOOP_INTERVAL_MS, RMT_CLOCK_MHZ, SETTINGS};
use crate::hal::{EmbassyClock, RmtLedWriter};
use crate::{
    Clock, CommandReceiver, Outgoing, OutgoingSender, RuntimeState, SmartLedWriter, WifiLink,
    WifiLinkSignal,
};

/// Control-Loop Logic - ohne direkte Hardware-Abhängigkeit
///
/// Ein kooperativer Loop, der bei jedem Durchlauf alle Trigger pollt:
/// - WiFi-Prüfung (`WIFICHECK`): loggt Verbindungswechsel
/// - Status (`UPDATE_STATUS`): baut die Status-Payload und reicht sie an MQTT
/// - Status-LED (`RGBSTATUSDELAY`): schaltet die LED nach dem Blinken aus
/// - Set-Kommandos: prüft, zählt und bestätigt sie auf `<root>/settings`
///
/// # Parameter
/// - `state`: der einzige Laufzeit-Zustand, gehört ab hier diesem Loop
/// - `led`: LED Writer (Hardware oder Mock)
/// - `clock`: Zeitquelle
/// - `stack`: embassy-net Stack für Link-Status und IP
/// - `link_signal`: SSID/RSSI-Updates vom WiFi-Task
/// - `outgoing`: Channel zum MQTT-Task
/// - `commands`: Set-Kommandos vom MQTT-Task
pub async fn control_logic<L: SmartLedWriter, C: Clock>(
    mut state: RuntimeState,
    mut led: L,
    clock: C,
    stack: &'static Stack<'static>,
    link_signal: &'static WifiLinkSignal,
    outgoing: OutgoingSender,
    commands: CommandReceiver,
) {
    let indicator = StatusIndicator::new(
        SETTINGS.leds.brightness,
        SETTINGS.timing.rgb_off_delay_ms,
    );
    let wifi_trigger = SETTINGS.wifi_check_trigger();
    let status_trigger = SETTINGS.status_trigger();

    let Ok(status_topic) = Topic::Status.under(SETTINGS.mqtt.topic_root) else {
        error!("Control: topic root too long, status disabled");
        return;
    };
    let Ok(settings_topic) = Topic::Settings.under(SETTINGS.mqtt.topic_root) else {
        error!("Control: topic root too long, commands disabled");
        return;
    };

    let boot = clock.now();
    state.mark(TimerSlot::Uptime, boot);
    // Erste Status-Nachricht erst nach einem vollen Intervall
    state.mark(TimerSlot::LastStatus, boot);

    let mut link = WifiLink { ssid: "", rssi: 0 };
    let mut link_up = false;

    loop {
        let now = clock.now();
        state.mark(TimerSlot::LastTick, now);

        if let Some(update) = link_signal.try_take() {
            link = update;
        }

        if wifi_trigger.poll(&mut state, now) {
            let up = stack.is_link_up() && stack.config_v4().is_some();
            if up != link_up {
                link_up = up;
                if up {
                    info!("Control: WiFi link up ({})", link.ssid);
                } else {
                    warn!("Control: WiFi link lost");
                    if indicator
                        .flash(&mut state, &mut led, StatusColor::Error, now)
                        .is_err()
                    {
                        error!("Failed to write to LED");
                    }
                }
            }
        }

        if status_trigger.poll(&mut state, now) {
            let ip = stack
                .config_v4()
                .map(|config| config.address.address().octets());
            let info = LinkInfo {
                ssid: link.ssid,
                rssi: link.rssi,
                ip,
            };

            match write_status(&mut state, &info, now) {
                Ok(()) => {
                    let msg = Outgoing {
                        topic: status_topic.clone(),
                        payload: state.read::<MqttStat>(),
                    };
                    if outgoing.try_send(msg).is_err() {
                        warn!("Control: MQTT queue full, status dropped");
                    }
                    if indicator
                        .flash(&mut state, &mut led, StatusColor::Ok, now)
                        .is_err()
                    {
                        error!("Failed to write to LED");
                    }
                }
                Err(e) => error!("Control: status payload failed: {}", e),
            }

            if SETTINGS.debug.serial && write_summary(&mut state, now).is_ok() {
                info!("Status: {}", state.field::<Msg>().as_str());
            }
        }

        while let Ok(command) = commands.try_receive() {
            let topic = command.topic.as_str();
            match parse_set_command(&mut state, SETTINGS.mqtt.topic_root, topic, &command.payload) {
                Ok(set) => {
                    info!("Control: set {} = {}", set.register.name, set.value);
                    match write_command_ack(&mut state, &set) {
                        Ok(()) => {
                            let msg = Outgoing {
                                topic: settings_topic.clone(),
                                payload: state.read::<Message>(),
                            };
                            if outgoing.try_send(msg).is_err() {
                                warn!("Control: MQTT queue full, ack dropped");
                            }
                        }
                        Err(e) => error!("Control: ack payload failed: {}", e),
                    }
                    if indicator
                        .flash(&mut state, &mut led, StatusColor::Busy, now)
                        .is_err()
                    {
                        error!("Failed to write to LED");
                    }
                }
                Err(e) => warn!("Control: rejected command on '{}': {}", topic, e),
            }
        }

        if indicator.poll(&mut state, &mut led, now).is_err() {
            error!("Failed to write to LED");
        }

        // Async Delay: gibt CPU an andere Tasks zurück
        Timer::after(Duration::from_millis(CONTROL_LOOP_INTERVAL_MS)).await;
    }
}

/// Control Task - Embassy Task für den Control-Loop
///
/// Initialisiert die Status-LED und übergibt dann an `control_logic()`.
///
/// # Parameter
/// - `led_pin`: GPIO0 (RGBLED_PIN) für die LED-Datenleitung
/// - `rmt_peripheral`: RMT Peripheral für präzises Timing
#[embassy_executor::task]
pub async fn control_task(
    state: RuntimeState,
    led_pin: esp_hal::peripherals::GPIO0<'static>,
    rmt_peripheral: esp_hal::peripherals::RMT<'static>,
    stack: &'static Stack<'static>,
    link_signal: &'static WifiLinkSignal,
    outgoing: OutgoingSender,
    commands: CommandReceiver,
) {
    // Buffer für SmartLED Daten erstellen (1 LED)
    let mut rmt_buffer = smart_led_buffer!(1);

    let led = match RmtLedWriter::new(led_pin, rmt_peripheral, RMT_CLOCK_MHZ, &mut rmt_buffer) {
        Ok(led) => led,
        Err(e) => {
            error!("Control: status LED init failed: {}", e);
            return;
        }
    };

    control_logic(state, led, EmbassyClock, stack, link_signal, outgoing, commands).await;
}

// src/app.rs
use crate::client::{NordClient, PollingHandle};
use crate::config::AppConfig;
use crate::countries::{self, CountryDirectory};
use crate::menu::{APP_TITLE, MenuState};
use crate::runner::CliRunner;
use crate::status::Status;
use eframe::egui;
use log::error;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::{oneshot, watch};

const BLINK_PERIOD_SECS: f64 = 0.3;
const REPAINT_INTERVAL: Duration = Duration::from_millis(300);
const COUNTRIES_TIMEOUT: Duration = Duration::from_secs(10);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const ACTIVE_COLOR: egui::Color32 = egui::Color32::from_rgb(0x41, 0x87, 0xf6);
const INACTIVE_COLOR: egui::Color32 = egui::Color32::GRAY;

pub struct TrayApp {
    config: AppConfig,
    client: NordClient,
    busy: watch::Receiver<bool>,
    polling: Option<PollingHandle>,

    countries: CountryDirectory,
    countries_rx: Option<oneshot::Receiver<CountryDirectory>>,
    selected_country: Option<String>,

    // Fields drop in order; the worker threads behind `client` go last.
    runtime: Runtime,
}

impl TrayApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig, runtime: Runtime) -> Self {
        let client = NordClient::new(CliRunner, config.cli_settings(), runtime.handle().clone());
        let busy = client.busy();
        let polling = Some(client.start_polling());

        let countries_rx = if config.fetch_countries {
            let (tx, rx) = oneshot::channel();
            let url = config.countries_url.clone();
            runtime.spawn(async move {
                let _ = tx.send(countries::fetch(&url, COUNTRIES_TIMEOUT).await);
            });
            Some(rx)
        } else {
            None
        };
        let selected_country = config.last_country.clone();

        Self {
            config,
            client,
            busy,
            polling,
            countries: CountryDirectory::default(),
            countries_rx,
            selected_country,
            runtime,
        }
    }

    fn receive_countries(&mut self) {
        let Some(rx) = self.countries_rx.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(directory) => {
                self.countries = directory;
                self.countries_rx = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => self.countries_rx = None,
        }
    }

    /// The selected country, if the directory still knows it.
    fn connect_country(&self) -> Option<String> {
        self.selected_country
            .as_deref()
            .filter(|code| self.countries.name_for(code).is_some())
            .map(str::to_string)
    }

    fn draw_icon(ui: &mut egui::Ui, active: bool) -> egui::Response {
        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(18.0, 18.0), egui::Sense::hover());
        let color = if active { ACTIVE_COLOR } else { INACTIVE_COLOR };
        ui.painter().circle_filled(rect.center(), 8.0, color);
        response
    }

    fn draw_countries(&mut self, ui: &mut egui::Ui) {
        if self.countries.is_empty() {
            if self.countries_rx.is_some() {
                ui.label("Loading countries...");
            }
            return;
        }

        let selected_text = self
            .selected_country
            .as_deref()
            .and_then(|code| self.countries.name_for(code))
            .unwrap_or("Best available")
            .to_string();

        ui.horizontal(|ui| {
            ui.label("Country:");
            egui::ComboBox::from_id_salt("country_combobox")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.selected_country, None, "Best available");
                    for (name, code) in self.countries.iter() {
                        ui.selectable_value(
                            &mut self.selected_country,
                            Some(code.to_string()),
                            name,
                        );
                    }
                });
        });
    }
}

impl eframe::App for TrayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.receive_countries();

        let (status, snapshot) = self.client.get_snapshot();
        let report = self.client.report();
        let menu = MenuState::from_snapshot(status, &snapshot);
        let busy = *self.busy.borrow();
        let blink_on = (ctx.input(|i| i.time) / BLINK_PERIOD_SECS) as u64 % 2 == 0;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                Self::draw_icon(ui, menu.icon_frame(busy, blink_on))
                    .on_hover_text(menu.tooltip.as_str());
                ui.heading(APP_TITLE);
            });

            ui.horizontal(|ui| {
                ui.label("Status:");
                let color = match status {
                    Status::Done => egui::Color32::GREEN,
                    Status::Stalled => egui::Color32::KHAKI,
                    Status::Failed | Status::NoNetwork => egui::Color32::RED,
                };
                ui.colored_label(color, status.label());
                if busy {
                    ui.spinner();
                }
            });

            let connection_text = match (&snapshot.server_name, snapshot.connected) {
                (Some(server), true) => format!("Connected to {}", server),
                (None, true) => "Connected".to_string(),
                _ => "Disconnected".to_string(),
            };
            ui.label(connection_text);
            let last_checked = report
                .updated_at
                .map_or_else(|| "never".to_string(), |t| t.format("%H:%M:%S").to_string());
            ui.label(format!("Last checked: {}", last_checked))
                .on_hover_text(format!("Update #{}", report.revision));
            ui.separator();

            self.draw_countries(ui);

            ui.horizontal(|ui| {
                if menu.show_connect
                    && ui.add_enabled(!busy, egui::Button::new("Connect")).clicked()
                {
                    drop(self.client.trigger_connect(self.connect_country()));
                }
                if menu.show_disconnect
                    && ui
                        .add_enabled(!busy, egui::Button::new("Disconnect"))
                        .clicked()
                {
                    drop(self.client.trigger_disconnect());
                }
            });

            let mut kill_switch = menu.kill_switch_checked;
            if ui
                .add_enabled(
                    menu.kill_switch_enabled,
                    egui::Checkbox::new(&mut kill_switch, "Kill Switch"),
                )
                .clicked()
            {
                drop(self.client.trigger_set_kill_switch(!snapshot.kill_switch));
            }

            let mut meshnet = menu.meshnet_checked;
            if ui
                .add_enabled(
                    menu.meshnet_enabled,
                    egui::Checkbox::new(&mut meshnet, "Meshnet"),
                )
                .clicked()
            {
                drop(self.client.trigger_set_meshnet(!snapshot.meshnet));
            }

            ui.separator();
            if ui.button("Quit").clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(polling) = self.polling.take() {
            // Let an in-flight cycle finish so its child process is not orphaned.
            self.runtime.block_on(polling.stop(SHUTDOWN_TIMEOUT));
        }
        self.config.last_country = self.selected_country.clone();
        if let Err(e) = self.config.save() {
            error!("Failed to save app config on exit: {}", e);
        }
    }
}

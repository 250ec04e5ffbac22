use frc_widget::zoon::{eprintln, println, *};
use frc_widget::{CaptchaControl, ConfigSource, FriendlyCaptcha, StartMode, Theme};

// Friendly Captcha test sitekey, always solvable.
const DEMO_SITEKEY: &str = "FCMGEMUD2KTDSQ5H";

fn main() {
    start_app("app", root);
}

fn root() -> impl Element {
    let control = CaptchaControl::new();
    let mounted = Mutable::new(true);
    Column::new()
        .s(Padding::all(20))
        .s(Gap::new().y(12))
        .item(El::new().s(Font::new().size(20).weight(FontWeight::SemiBold)).child("Sign up"))
        .item(El::new().child_signal(mounted.signal().map_true({
            let control = control.clone();
            move || captcha(&control)
        })))
        .item(
            El::new().child_signal(control.response_signal().map(|response| match response {
                Some(response) => format!("Response: {response}"),
                None => "Not solved yet".to_string(),
            })),
        )
        .item(
            Row::new()
                .s(Gap::new().x(8))
                .item(button("Reset", {
                    let control = control.clone();
                    move || {
                        if !control.reset() {
                            println!("Nothing to reset yet");
                        }
                    }
                }))
                .item(button("Toggle widget", move || mounted.update(|mounted| not(mounted)))),
        )
}

fn captcha(control: &CaptchaControl) -> impl Element {
    FriendlyCaptcha::new()
        .sitekey(DEMO_SITEKEY)
        .start_mode(StartMode::Focus)
        // Served next to the app; missing or broken JSON falls back to the attributes above.
        .config_source(ConfigSource::url("/frc-config.json"))
        .theme(Theme::Auto)
        .control(control)
        .on_complete(|detail| println!("Captcha solved: {detail:?}"))
        .on_expire(|_| println!("Captcha expired"))
        .on_error(|detail| eprintln!("Captcha error: {detail:?}"))
        .render()
}

fn button(label: &'static str, on_press: impl FnMut() + 'static) -> impl Element {
    Button::new()
        .s(Padding::new().x(14).y(7))
        .s(RoundedCorners::all(22))
        .s(Background::new().color(color!("rgba(108, 162, 255, 0.75)")))
        .label(label)
        .on_press(on_press)
}

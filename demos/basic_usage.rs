use relay_errors::{Error, ResultExt, Result, codes, is_retryable, params};
use std::fs;

fn load_profile(user_id: &str) -> Result<String> {
    if user_id == "u-404" {
        return Err(Error::not_found(
            "user",
            "no such user",
            Some(params! { "user_id" => user_id }),
        ));
    }
    Ok(format!("profile of {user_id}"))
}

fn render_page(user_id: &str) -> Result<String> {
    let profile = load_profile(user_id).augment_err("rendering profile page", None)?;
    Ok(format!("<h1>{profile}</h1>"))
}

fn read_settings() -> Result<String> {
    fs::read_to_string("/nonexistent/settings.toml")
        .augment_err("reading settings", Some(params! { "path" => "/nonexistent/settings.toml" }))
}

fn main() {
    println!("--- Basic Usage Example ---\n");

    match render_page("u-404") {
        Ok(page) => println!("{page}"),
        Err(err) => {
            println!("1. What the caller sees:");
            println!("   \"{err}\"");

            println!("\n2. How the caller decides what to do:");
            println!("   is not_found.user?  {}", err.is(&[codes::NOT_FOUND, "user"]));
            println!("   family:             {:?}", err.family_of_code());
            println!("   retryable?          {}", is_retryable(Some(err.clone())));
            println!("   message chain:      {:?}", err.message_chain());

            println!("\n3. What goes to the log:");
            err.with_internal_log(|log| {
                let mut line = String::new();
                if log.write_to(&mut line).is_ok() {
                    println!("   {line}");
                }
            });
        }
    }

    println!("\n--- Foreign Errors ---\n");

    if let Err(err) = read_settings() {
        println!("   \"{err}\"");
        println!("   code:      {}", err.code());
        println!("   retryable: {}", err.retryable());
        println!("\n   Verbose:\n{}", err.verbose());
    }
}

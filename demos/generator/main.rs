use serial_keygen::*;

pub fn main() {
    // Create a generator that refuses usernames the target binary
    // never understood (characters above U+00FF).
    let generator = Generator::new(WideCharPolicy::Reject);

    // Derive the serial key for a username.
    // The same username always produces the same key, so a key handed
    // out once stays valid for that user.
    let key = generator.generate("hacktooth").unwrap();

    // Write the key information to the console.
    println!("Generated key");
    println!("-------------");
    println!("{}", key);
}

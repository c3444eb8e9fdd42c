use std::io::{BufRead, Write};

use crate::model::{Laureate, LaureateUpdate, Prize, PrizeUpdate};
use crate::{NobelClient, NobelError, Result};

/// The interactive text menu of `nobel-client`.
///
/// Answers are read line by line from `input` and everything is printed to `output`. A failed
/// request is printed as `Error: <status> <body>` and the menu goes on, only an IO error on
/// `input` or `output` ends it.
pub struct Menu<R, W> {
    client: NobelClient,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    /// creates a menu issuing its requests through `client`
    pub fn new(client: NobelClient, input: R, output: W) -> Self {
        Menu {
            client,
            input,
            output,
        }
    }

    /// shows the menu until the user picks 0 or the input ends
    pub async fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "--- NOBEL PRIZES ---")?;
            writeln!(self.output, "1. Show all prizes")?;
            writeln!(self.output, "2. Search by year")?;
            writeln!(self.output, "3. Search by year and category")?;
            writeln!(self.output, "4. Add a prize")?;
            writeln!(self.output, "5. Modify a laureate")?;
            writeln!(self.output, "6. Delete a prize")?;
            writeln!(self.output, "0. Exit")?;

            let choice = match self.ask("Choose an option: ")? {
                Some(choice) => choice,
                None => return Ok(()),
            };
            let outcome = match choice.as_str() {
                "1" => self.show_all().await,
                "2" => self.search_by_year().await,
                "3" => self.search_by_year_and_category().await,
                "4" => self.add_prize().await,
                "5" => self.modify_laureate().await,
                "6" => self.delete_prize().await,
                "0" => {
                    writeln!(self.output, "Bye!")?;
                    return Ok(());
                }
                _ => {
                    writeln!(self.output, "Invalid option, try again.")?;
                    Ok(())
                }
            };

            match outcome {
                Err(NobelError::Io(e)) => return Err(NobelError::Io(e)),
                Err(e) => writeln!(self.output, "Error: {}", e)?,
                Ok(()) => {}
            }
        }
    }

    async fn show_all(&mut self) -> Result<()> {
        let prizes = self.client.all().await?;
        self.list(&prizes.prizes)
    }

    async fn search_by_year(&mut self) -> Result<()> {
        let year = self.ask_year("Year: ")?;
        let prizes = self.client.by_year(year).await?;
        self.list(&prizes)
    }

    async fn search_by_year_and_category(&mut self) -> Result<()> {
        let year = self.ask_year("Year: ")?;
        let category = self.ask_required("Category: ")?;
        let prizes = self.client.by_year_and_category(year, &category).await?;
        self.list(&prizes)
    }

    async fn add_prize(&mut self) -> Result<()> {
        let year = self.ask_year("Year: ")?;
        let category = self.ask_required("Category: ")?;
        let mut prize = Prize::new(year, category, Vec::new());
        prize.overall_motivation = self.ask_optional("Overall motivation: ")?;

        loop {
            writeln!(self.output)?;
            writeln!(self.output, "-- New laureate --")?;
            let laureate = Laureate {
                firstname: self.ask_optional("First name: ")?,
                surname: self.ask_optional("Surname: ")?,
                motivation: self.ask_optional("Motivation: ")?,
                share: self.ask_optional("Share: ")?,
                ..Laureate::default()
            };
            prize.laureates.push(laureate);

            let more = self.ask("Add another laureate? (y/n): ")?.unwrap_or_default();
            if !more.eq_ignore_ascii_case("y") {
                break;
            }
        }

        let created = self.client.create(&prize).await?;
        let ids: Vec<String> = created.laureates.iter().map(|l| l.id.to_string()).collect();
        writeln!(self.output, "Prize added, laureate ids: {}", ids.join(", "))?;
        Ok(())
    }

    async fn modify_laureate(&mut self) -> Result<()> {
        let year = self.ask_year("Prize year: ")?;
        let category = self.ask_required("Prize category: ")?;
        let overall = self.ask_optional("New overall motivation (blank keeps it): ")?;
        let id = self.ask_required("Id of the laureate to modify: ")?;
        let id: u64 = id
            .parse()
            .map_err(|_| NobelError::Parsing(format!("could not parse {} into a laureate id", id)))?;

        // blank answers are left out of the update, so they keep their value
        let laureate = LaureateUpdate {
            id: Some(id),
            firstname: self.ask_optional("New first name: ")?.map(Some),
            surname: self.ask_optional("New surname: ")?.map(Some),
            motivation: self.ask_optional("New motivation: ")?.map(Some),
            share: self.ask_optional("New share: ")?.map(Some),
        };
        let update = PrizeUpdate {
            overall_motivation: overall.map(Some),
            laureates: Some(vec![laureate]),
        };

        self.client.update(year, &category, &update).await?;
        writeln!(self.output, "Laureate modified.")?;
        Ok(())
    }

    async fn delete_prize(&mut self) -> Result<()> {
        let year = self.ask_year("Year of the prize to delete: ")?;
        let category = self.ask_required("Category of the prize to delete: ")?;
        let deleted = self.client.delete(year, &category).await?;
        writeln!(self.output, "{}", deleted.message)?;
        Ok(())
    }

    fn list(&mut self, prizes: &[Prize]) -> Result<()> {
        for prize in prizes {
            writeln!(self.output, "{} - {}", prize.year, prize.category)?;
        }
        Ok(())
    }

    /// prints `label` and reads one trimmed line, `None` once the input is exhausted
    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// like `ask`, but a blank answer is `None`
    fn ask_optional(&mut self, label: &str) -> Result<Option<String>> {
        Ok(self.ask(label)?.filter(|answer| !answer.is_empty()))
    }

    fn ask_required(&mut self, label: &str) -> Result<String> {
        self.ask_optional(label)?
            .ok_or_else(|| NobelError::Parsing("a value is required".to_string()))
    }

    fn ask_year(&mut self, label: &str) -> Result<i32> {
        let year = self.ask_required(label)?;
        year.parse()
            .map_err(|_| NobelError::Parsing(format!("could not parse {} into a year", year)))
    }
}
